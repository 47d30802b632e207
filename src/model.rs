//! Core data model.
//!
//! A work item is a card on the board. It carries the effort each skill has
//! to spend on it and the simulated timestamps of its trip from the first
//! work stage to done.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Simulated time in milliseconds since the board was created.
pub type SimTime = u64;

/// Simulated milliseconds in one day.
pub const MILLIS_PER_DAY: f64 = 1000.0 * 60.0 * 60.0 * 24.0;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

macro_rules! id_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub u64);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(
    /// Identity of a work item.
    ItemId
);
id_newtype!(
    /// Identity of a worker.
    WorkerId
);
id_newtype!(
    /// Identity of a stage (work list).
    StageId
);

/// Hands out monotonically increasing ids, one counter per entity kind.
///
/// Each board owns its own allocator, so ids never leak between runs.
#[derive(Debug, Clone)]
pub struct IdAllocator {
    next_item: u64,
    next_worker: u64,
    next_stage: u64,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self {
            next_item: 1,
            next_worker: 1,
            next_stage: 1,
        }
    }

    pub fn next_item(&mut self) -> ItemId {
        let id = ItemId(self.next_item);
        self.next_item += 1;
        id
    }

    pub fn next_worker(&mut self) -> WorkerId {
        let id = WorkerId(self.next_worker);
        self.next_worker += 1;
        id
    }

    pub fn next_stage(&mut self) -> StageId {
        let id = StageId(self.next_stage);
        self.next_stage += 1;
        id
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Work Item
// ---------------------------------------------------------------------------

/// A unit of work moving across the board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: ItemId,

    /// Effort per skill. Fixed at creation; the engine only tracks timing.
    pub work: BTreeMap<String, f64>,

    /// Display tag for card rendering. Not interpreted by the engine.
    pub color: String,

    /// When the item entered the first work stage.
    pub start_time: Option<SimTime>,

    /// When the item reached done.
    pub end_time: Option<SimTime>,

    /// `end_time - start_time`, set on arrival in done.
    pub duration: Option<SimTime>,
}

impl WorkItem {
    pub fn new(id: ItemId, work: BTreeMap<String, f64>, color: impl Into<String>) -> Self {
        Self {
            id,
            work,
            color: color.into(),
            start_time: None,
            end_time: None,
            duration: None,
        }
    }

    /// Effort required for `skill`; zero when the item needs none of it.
    pub fn effort_for(&self, skill: &str) -> f64 {
        self.work.get(skill).copied().unwrap_or(0.0)
    }

    pub fn is_started(&self) -> bool {
        self.start_time.is_some()
    }

    pub fn is_finished(&self) -> bool {
        self.end_time.is_some()
    }
}
