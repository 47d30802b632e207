//! Flow metrics computed from the board's event stream.
//!
//! The tracker only keeps running counters. Every snapshot is recomputed
//! from them, so repeated updates never accumulate rounding drift.
//!
//! Worker busy percentages count assignments, not occupied time: a worker
//! who takes one long item looks less busy than one who takes many short
//! ones. This matches how the numbers have always been reported.

use serde::Serialize;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::board::Board;
use crate::event::{Event, EventKind, SubscriptionId};
use crate::model::{MILLIS_PER_DAY, SimTime};

/// Flow metrics at one point in simulated time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsSnapshot {
    /// Finished items per simulated day.
    pub throughput: f64,
    /// Mean lead time of finished items, in simulated days.
    pub lead_time: f64,
    /// Items started but not finished.
    pub wip: usize,
    /// Simulated seconds since the stats were attached.
    pub time_worked: f64,
    /// Busy percentage per worker name.
    pub workers: BTreeMap<String, i64>,
}

type Listener = Box<dyn FnMut(&StatsSnapshot)>;

/// Running counters for one run.
pub struct StatsTracker {
    started_at: SimTime,
    finished_items: u64,
    total_lead_time: SimTime,
    current_wip: usize,
    max_wip: usize,
    worker_stats: BTreeMap<String, u64>,
    listeners: Vec<Listener>,
}

impl StatsTracker {
    pub fn new(started_at: SimTime) -> Self {
        Self {
            started_at,
            finished_items: 0,
            total_lead_time: 0,
            current_wip: 0,
            max_wip: 0,
            worker_stats: BTreeMap::new(),
            listeners: Vec::new(),
        }
    }

    pub fn finished_items(&self) -> u64 {
        self.finished_items
    }

    pub fn total_lead_time(&self) -> SimTime {
        self.total_lead_time
    }

    pub fn current_wip(&self) -> usize {
        self.current_wip
    }

    pub fn peak_wip(&self) -> usize {
        self.max_wip
    }

    /// Assignment count per worker name.
    pub fn busy_tallies(&self) -> &BTreeMap<String, u64> {
        &self.worker_stats
    }

    /// Receive every snapshot recomputed after an update.
    pub fn on_update(&mut self, listener: impl FnMut(&StatsSnapshot) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Fold one event into the counters.
    pub fn observe(&mut self, event: &Event) {
        match &event.kind {
            EventKind::WorkItemStarted { .. } => {
                self.current_wip += 1;
                self.max_wip = self.max_wip.max(self.current_wip);
            }
            EventKind::WorkItemFinished { item } => {
                self.finished_items += 1;
                self.current_wip = self.current_wip.saturating_sub(1);
                if let Some(duration) = item.duration {
                    self.total_lead_time += duration;
                }
            }
            EventKind::WorkerCreated { worker } => {
                self.worker_stats.entry(worker.name.clone()).or_insert(0);
                return;
            }
            EventKind::WorkerWorking { worker } => {
                *self.worker_stats.entry(worker.name.clone()).or_insert(0) += 1;
            }
            _ => return,
        }

        let snapshot = self.snapshot_at(event.at);
        for listener in &mut self.listeners {
            listener(&snapshot);
        }
    }

    pub fn snapshot_at(&self, now: SimTime) -> StatsSnapshot {
        let elapsed_ms = now.saturating_sub(self.started_at) as f64;
        let elapsed_secs = elapsed_ms / 1000.0;
        let elapsed_days = elapsed_ms / MILLIS_PER_DAY;

        let throughput = if elapsed_days > 0.0 {
            self.finished_items as f64 / elapsed_days
        } else {
            0.0
        };
        let lead_time = if self.finished_items > 0 {
            self.total_lead_time as f64 / self.finished_items as f64 / MILLIS_PER_DAY
        } else {
            0.0
        };
        let workers = self
            .worker_stats
            .iter()
            .map(|(name, &tally)| {
                let percent = if elapsed_secs > 0.0 {
                    (tally as f64 / elapsed_secs * 100.0).round() as i64
                } else {
                    0
                };
                (name.clone(), percent)
            })
            .collect();

        StatsSnapshot {
            throughput,
            lead_time,
            wip: self.current_wip,
            time_worked: elapsed_secs,
            workers,
        }
    }
}

impl std::fmt::Debug for StatsTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatsTracker")
            .field("started_at", &self.started_at)
            .field("finished_items", &self.finished_items)
            .field("total_lead_time", &self.total_lead_time)
            .field("current_wip", &self.current_wip)
            .field("max_wip", &self.max_wip)
            .field("worker_stats", &self.worker_stats)
            .finish()
    }
}

/// A tracker subscribed to one board's bus.
///
/// Listeners registered through [`Stats::on_update`] run while the tracker
/// is borrowed and must not call back into this handle.
#[derive(Debug)]
pub struct Stats {
    tracker: Rc<RefCell<StatsTracker>>,
    subscription: SubscriptionId,
}

impl Stats {
    /// Start counting from the board's current clock.
    pub fn attach(board: &mut Board) -> Self {
        let tracker = Rc::new(RefCell::new(StatsTracker::new(board.now())));
        let sink = Rc::clone(&tracker);
        let subscription = board.subscribe(move |event| sink.borrow_mut().observe(event));
        Self {
            tracker,
            subscription,
        }
    }

    /// Stop listening to the board. Counters stay readable.
    pub fn detach(&self, board: &mut Board) -> bool {
        board.unsubscribe(self.subscription)
    }

    pub fn on_update(&self, listener: impl FnMut(&StatsSnapshot) + 'static) {
        self.tracker.borrow_mut().on_update(listener);
    }

    /// Stats as of the board's current clock.
    pub fn snapshot(&self, board: &Board) -> StatsSnapshot {
        self.snapshot_at(board.now())
    }

    pub fn snapshot_at(&self, now: SimTime) -> StatsSnapshot {
        self.tracker.borrow().snapshot_at(now)
    }

    pub fn finished_items(&self) -> u64 {
        self.tracker.borrow().finished_items()
    }

    pub fn peak_wip(&self) -> usize {
        self.tracker.borrow().peak_wip()
    }

    pub fn busy_tallies(&self) -> BTreeMap<String, u64> {
        self.tracker.borrow().busy_tallies().clone()
    }
}
