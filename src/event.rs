//! Structured events emitted by the board on every state transition.
//!
//! The board publishes into its own [`EventBus`]. Events are queued and
//! delivered in emission order; subscribers are called synchronously in
//! registration order and never re-entrantly. Stats, charts and renderers
//! all listen here.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::model::{SimTime, StageId, WorkItem, WorkerId};

/// A structured event emitted by the board.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Monotonic sequence number, starting at 1. Consumers can detect gaps.
    pub seq: u64,
    /// Simulated time of the transition.
    pub at: SimTime,
    /// What happened.
    pub kind: EventKind,
}

/// Minimal description of a stage carried in event payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageRef {
    pub id: StageId,
    /// Position on the board: 0 is the backlog, the last index is done.
    pub index: usize,
    pub name: String,
}

/// Minimal description of a worker carried in event payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerRef {
    pub id: WorkerId,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    WorkerCreated { worker: WorkerRef },
    WorkerWorking { worker: WorkerRef },
    WorkerIdle { worker: WorkerRef },
    WorkItemAdded { item: WorkItem, stage: StageRef },
    WorkItemRemoved { item: WorkItem, stage: StageRef },
    WorkItemStarted { item: WorkItem },
    WorkItemFinished { item: WorkItem },
    BoardReady { stages: Vec<StageRef> },
    BoardDone,
    BoardAllowNewWork,
    BoardDenyNewWork,
}

/// Handle returned by [`EventBus::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Subscriber {
    id: SubscriptionId,
    handler: Box<dyn FnMut(&Event)>,
}

/// Event channel scoped to one board.
pub struct EventBus {
    clock: SimTime,
    next_seq: u64,
    next_subscription: u64,
    pending: VecDeque<Event>,
    subscribers: Vec<Subscriber>,
    history: Vec<Event>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            clock: 0,
            next_seq: 1,
            next_subscription: 1,
            pending: VecDeque::new(),
            subscribers: Vec::new(),
            history: Vec::new(),
        }
    }

    /// Register a handler. Handlers see every event delivered after this call.
    pub fn subscribe(&mut self, handler: impl FnMut(&Event) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscribers.push(Subscriber {
            id,
            handler: Box::new(handler),
        });
        id
    }

    /// Remove a handler. Returns false if it was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|s| s.id != id);
        self.subscribers.len() != before
    }

    /// Drop every handler.
    pub fn dispose(&mut self) {
        self.subscribers.clear();
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Queue an event stamped with the current clock.
    pub fn publish(&mut self, kind: EventKind) {
        let event = Event {
            seq: self.next_seq,
            at: self.clock,
            kind,
        };
        self.next_seq += 1;
        self.pending.push_back(event);
    }

    /// Events delivered after sequence number `since_seq`.
    pub fn events_since(&self, since_seq: u64) -> &[Event] {
        let start = self.history.partition_point(|e| e.seq <= since_seq);
        &self.history[start..]
    }

    /// Every delivered event, oldest first.
    pub fn history(&self) -> &[Event] {
        &self.history
    }

    pub(crate) fn set_clock(&mut self, now: SimTime) {
        self.clock = now;
    }

    pub(crate) fn next_pending(&mut self) -> Option<Event> {
        self.pending.pop_front()
    }

    /// Deliver every queued event.
    ///
    /// Boards deliver their own events; this is for lists used on their own.
    pub fn flush(&mut self) {
        while let Some(event) = self.next_pending() {
            self.deliver(event);
        }
    }

    /// Hand an event to every subscriber, then record it.
    pub(crate) fn deliver(&mut self, event: Event) {
        for subscriber in &mut self.subscribers {
            (subscriber.handler)(&event);
        }
        self.history.push(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("clock", &self.clock)
            .field("next_seq", &self.next_seq)
            .field("pending", &self.pending.len())
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}
