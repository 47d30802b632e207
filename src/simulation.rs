//! One run: a board paired with the stats listening to it.

use serde::Serialize;
use tracing::{Span, info, warn};

use crate::board::{Board, BoardSnapshot};
use crate::model::SimTime;
use crate::stats::{Stats, StatsSnapshot};
use crate::telemetry::run::{record_outcome, start_run_span};

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Every item reached done.
    Done,
    /// Nothing pending but items remain, e.g. no worker has a required skill.
    Stalled,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Outcome::Done => "done",
            Outcome::Stalled => "stalled",
        };
        write!(f, "{s}")
    }
}

/// Final state of a finished run.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub scenario_id: u64,
    pub title: String,
    pub outcome: Outcome,
    pub finished_at: SimTime,
    pub finished_items: u64,
    pub peak_wip: usize,
    pub stats: StatsSnapshot,
    pub board: BoardSnapshot,
}

pub struct Simulation {
    scenario_id: u64,
    title: String,
    board: Board,
    stats: Stats,
    span: Span,
}

impl Simulation {
    pub fn new(scenario_id: u64, title: String, board: Board, stats: Stats) -> Self {
        let span = start_run_span(&title, scenario_id);
        Self {
            scenario_id,
            title,
            board,
            stats,
            span,
        }
    }

    pub fn scenario_id(&self) -> u64 {
        self.scenario_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn board_mut(&mut self) -> &mut Board {
        &mut self.board
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    pub fn now(&self) -> SimTime {
        self.board.now()
    }

    pub fn is_done(&self) -> bool {
        self.board.done()
    }

    pub fn is_stalled(&self) -> bool {
        self.board.is_stalled()
    }

    /// Current outcome, if the run cannot progress any further.
    pub fn outcome(&self) -> Option<Outcome> {
        if self.board.done() {
            Some(Outcome::Done)
        } else if self.board.is_stalled() {
            Some(Outcome::Stalled)
        } else {
            None
        }
    }

    pub fn stats_snapshot(&self) -> StatsSnapshot {
        self.stats.snapshot(&self.board)
    }

    pub fn step(&mut self) -> Option<SimTime> {
        let _entered = self.span.enter();
        self.board.step()
    }

    pub fn advance_by(&mut self, millis: SimTime) {
        let _entered = self.span.enter();
        self.board.advance_by(millis);
    }

    /// Fire completions until the board is done or stalls.
    pub fn run_to_completion(&mut self) -> Outcome {
        {
            let _entered = self.span.enter();
            self.board.run_until_idle();
        }
        let outcome = if self.board.done() {
            Outcome::Done
        } else {
            Outcome::Stalled
        };
        record_outcome(&self.span, outcome);
        outcome
    }

    /// Detach the stats from the board and summarise the run.
    pub fn finish(mut self) -> Report {
        self.stats.detach(&mut self.board);
        let outcome = self.outcome().unwrap_or(Outcome::Stalled);
        let report = Report {
            scenario_id: self.scenario_id,
            title: self.title.clone(),
            outcome,
            finished_at: self.board.now(),
            finished_items: self.stats.finished_items(),
            peak_wip: self.stats.peak_wip(),
            stats: self.stats.snapshot(&self.board),
            board: self.board.snapshot(),
        };
        match outcome {
            Outcome::Done => info!(
                scenario = self.scenario_id,
                title = %self.title,
                finished = report.finished_items,
                at = report.finished_at,
                "run finished"
            ),
            Outcome::Stalled => warn!(
                scenario = self.scenario_id,
                title = %self.title,
                remaining = self.board.size() - self.board.done_stage().size(),
                "run stalled"
            ),
        }
        report
    }
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("scenario_id", &self.scenario_id)
            .field("title", &self.title)
            .field("board", &self.board)
            .finish()
    }
}
