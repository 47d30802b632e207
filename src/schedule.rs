//! Discrete-event scheduler.
//!
//! Pending worker completions sit in a min-heap keyed by completion time.
//! The clock only moves when the board asks it to; nothing here waits on
//! wall-clock time.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use crate::model::{ItemId, SimTime};

/// A worker finishing its current item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Completion {
    pub at: SimTime,
    /// Tie-break: equal times fire in scheduling order.
    pub seq: u64,
    /// Position of the worker in the board's pool.
    pub worker: usize,
    pub item: ItemId,
    /// Stage the item is in progress in.
    pub from: usize,
    /// Stage the item moves to on completion.
    pub to: usize,
}

#[derive(Debug, Default)]
pub struct Scheduler {
    now: SimTime,
    next_seq: u64,
    pending: BinaryHeap<Reverse<Completion>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> SimTime {
        self.now
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Time of the next completion, if any.
    pub fn next_at(&self) -> Option<SimTime> {
        self.pending.peek().map(|Reverse(c)| c.at)
    }

    pub fn schedule(
        &mut self,
        after: SimTime,
        worker: usize,
        item: ItemId,
        from: usize,
        to: usize,
    ) -> SimTime {
        let at = self.now.saturating_add(after);
        self.pending.push(Reverse(Completion {
            at,
            seq: self.next_seq,
            worker,
            item,
            from,
            to,
        }));
        self.next_seq += 1;
        at
    }

    /// Pop the next completion due at or before `until`, moving the clock to it.
    pub fn pop_due(&mut self, until: SimTime) -> Option<Completion> {
        if self.next_at()? > until {
            return None;
        }
        let Reverse(completion) = self.pending.pop()?;
        self.now = self.now.max(completion.at);
        Some(completion)
    }

    /// Move the clock forward. Never moves it back.
    pub fn advance_clock(&mut self, to: SimTime) {
        self.now = self.now.max(to);
    }
}
