//! The board. Owns the stages, the worker pool, the clock and the event bus.
//!
//! All state transitions go through here. Stages are laid out as
//! `[backlog, work stages..., done]`; every item-added and allow-new-work
//! event triggers one dispatch attempt, which hands at most one waiting item
//! to the best idle worker.

use opentelemetry::KeyValue;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::Result;
use crate::event::{Event, EventBus, EventKind, StageRef, SubscriptionId};
use crate::model::{IdAllocator, ItemId, SimTime, WorkItem};
use crate::schedule::{Completion, Scheduler};
use crate::stage::{ColumnSnapshot, WorkList};
use crate::telemetry::metrics;
use crate::worker::{TimeScale, Worker};

pub const BACKLOG_NAME: &str = "Backlog";
pub const DONE_NAME: &str = "Done";

const BACKLOG: usize = 0;
const FIRST_WORK_STAGE: usize = 1;

/// Polled view of the whole board.
#[derive(Debug, Clone, Serialize)]
pub struct BoardSnapshot {
    pub now: SimTime,
    pub columns: Vec<ColumnSnapshot>,
    pub done: bool,
}

pub struct Board {
    stages: Vec<WorkList>,
    workers: Vec<Worker>,
    allow_new_work: bool,
    /// Gate closed by `deny_new_work`, independent of the WIP limit.
    manually_denied: bool,
    wip_limit: Option<usize>,
    wip: usize,
    done_announced: bool,
    time_scale: TimeScale,
    ids: IdAllocator,
    scheduler: Scheduler,
    bus: EventBus,
}

impl Board {
    /// Create a board with one work stage per skill, in the given order.
    pub fn new<S: AsRef<str>>(skills: &[S]) -> Self {
        Self::with_ids(skills, IdAllocator::new())
    }

    pub fn with_ids<S: AsRef<str>>(skills: &[S], mut ids: IdAllocator) -> Self {
        let first_skill = skills.first().map(|s| s.as_ref().to_string());
        let mut stages = Vec::with_capacity(skills.len() + 2);
        stages.push(WorkList::new(ids.next_stage(), BACKLOG, BACKLOG_NAME, first_skill));
        for skill in skills {
            let skill = skill.as_ref();
            stages.push(WorkList::new(
                ids.next_stage(),
                stages.len(),
                skill,
                Some(skill.to_string()),
            ));
        }
        stages.push(WorkList::new(ids.next_stage(), stages.len(), DONE_NAME, None));

        let mut board = Self {
            stages,
            workers: Vec::new(),
            allow_new_work: true,
            manually_denied: false,
            wip_limit: None,
            wip: 0,
            done_announced: false,
            time_scale: TimeScale::default(),
            ids,
            scheduler: Scheduler::new(),
            bus: EventBus::new(),
        };
        let stages = board.stages.iter().map(WorkList::stage_ref).collect();
        board.bus.publish(EventKind::BoardReady { stages });
        board.pump();
        board
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn stages(&self) -> &[WorkList] {
        &self.stages
    }

    pub fn workers(&self) -> &[Worker] {
        &self.workers
    }

    pub fn backlog(&self) -> &WorkList {
        &self.stages[BACKLOG]
    }

    pub fn done_stage(&self) -> &WorkList {
        &self.stages[self.done_index()]
    }

    /// Stages between backlog and done.
    pub fn work_stages(&self) -> &[WorkList] {
        &self.stages[FIRST_WORK_STAGE..self.done_index()]
    }

    /// Stage reference by board position.
    pub fn stage_ref(&self, index: usize) -> Option<StageRef> {
        self.stages.get(index).map(WorkList::stage_ref)
    }

    /// Per-stage copies of the items.
    pub fn items(&self) -> Vec<Vec<WorkItem>> {
        self.stages.iter().map(WorkList::items).collect()
    }

    /// Total items on the board.
    pub fn size(&self) -> usize {
        self.stages.iter().map(WorkList::size).sum()
    }

    /// True when every item sits in done.
    pub fn done(&self) -> bool {
        self.done_stage().size() == self.size()
    }

    /// Items started but not finished.
    pub fn wip(&self) -> usize {
        self.wip
    }

    pub fn wip_limit(&self) -> Option<usize> {
        self.wip_limit
    }

    pub fn allows_new_work(&self) -> bool {
        self.allow_new_work
    }

    pub fn now(&self) -> SimTime {
        self.scheduler.now()
    }

    pub fn time_scale(&self) -> TimeScale {
        self.time_scale
    }

    /// Completions waiting to fire.
    pub fn pending(&self) -> usize {
        self.scheduler.pending()
    }

    /// Not done, and nothing left that could move an item.
    pub fn is_stalled(&self) -> bool {
        !self.done() && self.scheduler.is_empty()
    }

    pub fn snapshot(&self) -> BoardSnapshot {
        BoardSnapshot {
            now: self.now(),
            columns: self.stages.iter().map(WorkList::snapshot).collect(),
            done: self.done(),
        }
    }

    pub fn ids_mut(&mut self) -> &mut IdAllocator {
        &mut self.ids
    }

    // -----------------------------------------------------------------------
    // Events
    // -----------------------------------------------------------------------

    pub fn subscribe(&mut self, handler: impl FnMut(&Event) + 'static) -> SubscriptionId {
        self.bus.subscribe(handler)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.bus.unsubscribe(id)
    }

    pub fn events(&self) -> &EventBus {
        &self.bus
    }

    pub fn events_since(&self, since_seq: u64) -> &[Event] {
        self.bus.events_since(since_seq)
    }

    // -----------------------------------------------------------------------
    // Setup and control
    // -----------------------------------------------------------------------

    pub fn add_workers(&mut self, workers: impl IntoIterator<Item = Worker>) {
        for worker in workers {
            self.bus.publish(EventKind::WorkerCreated {
                worker: worker.worker_ref(),
            });
            self.workers.push(worker);
        }
        self.pump();
    }

    /// Append items to the backlog.
    pub fn add_work_items(&mut self, items: impl IntoIterator<Item = WorkItem>) {
        for item in items {
            self.stages[BACKLOG].add(item, &mut self.bus);
        }
        self.pump();
    }

    /// Cap the number of started-but-unfinished items.
    pub fn set_wip_limit(&mut self, limit: Option<usize>) {
        self.wip_limit = limit;
        self.update_gate();
        self.pump();
    }

    /// Lift a manual denial and try to start work.
    ///
    /// While the WIP limit is reached the gate stays closed; it opens on its
    /// own once an item finishes.
    pub fn allow_new_work(&mut self) {
        self.manually_denied = false;
        self.update_gate();
        self.pump();
    }

    /// Close the backlog gate until [`Board::allow_new_work`]. Items already
    /// started keep flowing.
    pub fn deny_new_work(&mut self) {
        self.manually_denied = true;
        self.update_gate();
        self.pump();
    }

    pub fn set_time_scale(&mut self, scale: TimeScale) {
        self.time_scale = scale;
    }

    /// Make every completion scheduled from now on `factor` times faster.
    pub fn speed_up_by(&mut self, factor: f64) -> Result<()> {
        self.time_scale = TimeScale::speed_up_by(factor)?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Clock
    // -----------------------------------------------------------------------

    /// Fire the next pending completion. Returns its time, or `None` if idle.
    pub fn step(&mut self) -> Option<SimTime> {
        let completion = self.scheduler.pop_due(SimTime::MAX)?;
        self.complete(completion);
        Some(completion.at)
    }

    /// Fire everything due up to `until`, then move the clock there.
    pub fn advance_to(&mut self, until: SimTime) {
        while let Some(completion) = self.scheduler.pop_due(until) {
            self.complete(completion);
        }
        self.scheduler.advance_clock(until);
        self.bus.set_clock(self.scheduler.now());
    }

    pub fn advance_by(&mut self, millis: SimTime) {
        self.advance_to(self.now().saturating_add(millis));
    }

    /// Fire completions until none are left. Returns the final clock.
    pub fn run_until_idle(&mut self) -> SimTime {
        while self.step().is_some() {}
        self.now()
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn done_index(&self) -> usize {
        self.stages.len() - 1
    }

    fn at_wip_limit(&self) -> bool {
        self.wip_limit.is_some_and(|limit| self.wip >= limit)
    }

    /// Recompute the backlog gate. Emits an event only when it flips.
    fn update_gate(&mut self) {
        let open = !self.manually_denied && !self.at_wip_limit();
        if open == self.allow_new_work {
            return;
        }
        self.allow_new_work = open;
        if open {
            self.bus.publish(EventKind::BoardAllowNewWork);
        } else {
            self.bus.publish(EventKind::BoardDenyNewWork);
        }
    }

    /// Deliver queued events. The board reacts to each one before subscribers see it.
    fn pump(&mut self) {
        while let Some(event) = self.bus.next_pending() {
            match event.kind {
                EventKind::WorkItemAdded { .. } | EventKind::BoardAllowNewWork => {
                    self.assign_new_work_if_possible();
                }
                _ => {}
            }
            self.bus.deliver(event);
        }
    }

    fn assign_new_work_if_possible(&mut self) {
        if self.done() {
            return;
        }
        let done = self.done_index();

        // Closest to done first, backlog last.
        let Some((selected, worker)) = (FIRST_WORK_STAGE..done)
            .rev()
            .chain(std::iter::once(BACKLOG))
            .filter(|&i| self.stages[i].has_work())
            .find_map(|i| self.best_worker_for(i).map(|w| (i, w)))
        else {
            return;
        };

        if selected == BACKLOG && !self.allow_new_work {
            debug!("backlog gated, not starting new work");
            return;
        }

        let in_progress = if selected == BACKLOG {
            FIRST_WORK_STAGE
        } else {
            selected
        };
        self.start_working_on(worker, selected, in_progress, in_progress + 1);
    }

    /// Idle worker with the strictly highest proficiency for the stage's
    /// skill. Ties go to the worker added first.
    fn best_worker_for(&self, stage: usize) -> Option<usize> {
        let skill = self.stages[stage].necessary_skill()?;
        let mut best: Option<(usize, f64)> = None;
        for (index, worker) in self.workers.iter().enumerate() {
            let score = worker.can_work_on(skill);
            if score <= 0.0 {
                continue;
            }
            if best.is_none_or(|(_, top)| score > top) {
                best = Some((index, score));
            }
        }
        best.map(|(index, _)| index)
    }

    fn start_working_on(&mut self, worker: usize, source: usize, in_progress: usize, target: usize) {
        let Some(item) = self.stages[source].peek().cloned() else {
            return;
        };
        let Some(skill) = self.stages[in_progress].necessary_skill().map(str::to_string) else {
            return;
        };

        let duration = self.workers[worker].duration_for(&item, &skill, self.time_scale);
        self.workers[worker].set_busy();
        self.bus.publish(EventKind::WorkerWorking {
            worker: self.workers[worker].worker_ref(),
        });

        self.move_item(source, in_progress, item.id);
        self.stages[in_progress].mark_in_progress(item.id);

        let at = self
            .scheduler
            .schedule(duration, worker, item.id, in_progress, target);
        metrics::worker_assignments().add(1, &[KeyValue::new("skill", skill.clone())]);
        debug!(
            item = %item.id,
            worker = %self.workers[worker].name(),
            stage = %self.stages[in_progress].name(),
            duration,
            at,
            "work assigned"
        );
    }

    fn complete(&mut self, completion: Completion) {
        self.bus.set_clock(self.scheduler.now());
        self.workers[completion.worker].set_idle();
        self.move_item(completion.from, completion.to, completion.item);
        self.bus.publish(EventKind::WorkerIdle {
            worker: self.workers[completion.worker].worker_ref(),
        });
        self.pump();
    }

    /// Remove-then-add, stamping start and finish as the item crosses them.
    fn move_item(&mut self, from: usize, to: usize, id: ItemId) {
        let Some(mut item) = self.stages[from].remove(id, &mut self.bus) else {
            return;
        };
        let now = self.scheduler.now();
        let done = self.done_index();

        let started = to == FIRST_WORK_STAGE && !item.is_started();
        if started {
            item.start_time = Some(now);
        }
        let finished = to == done && !item.is_finished();
        if finished {
            item.end_time = Some(now);
            item.duration = Some(now.saturating_sub(item.start_time.unwrap_or(0)));
        }

        debug!(item = %id, from = %self.stages[from].name(), to = %self.stages[to].name(), "item moved");
        self.stages[to].add(item.clone(), &mut self.bus);

        if started {
            self.wip += 1;
            metrics::items_started().add(1, &[]);
            self.bus.publish(EventKind::WorkItemStarted { item: item.clone() });
            self.update_gate();
        }

        if finished {
            self.wip = self.wip.saturating_sub(1);
            metrics::items_finished().add(1, &[]);
            if let Some(duration) = item.duration {
                metrics::lead_time_ms().record(duration as f64, &[]);
            }
            self.bus.publish(EventKind::WorkItemFinished { item });
            self.update_gate();
            if self.done() && !self.done_announced {
                self.done_announced = true;
                info!(items = self.size(), at = now, "board done");
                self.bus.publish(EventKind::BoardDone);
            }
        }
    }
}

impl std::fmt::Debug for Board {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Board")
            .field("stages", &self.stages.iter().map(WorkList::name).collect::<Vec<_>>())
            .field("workers", &self.workers.len())
            .field("size", &self.size())
            .field("wip", &self.wip)
            .field("allow_new_work", &self.allow_new_work)
            .field("now", &self.now())
            .finish()
    }
}
