//! Span helpers for simulation runs.

use tracing::Span;

use crate::simulation::Outcome;

/// Start a span covering one scenario run.
///
/// `run.outcome` is declared empty and filled in by [`record_outcome`].
pub fn start_run_span(title: &str, scenario_id: u64) -> Span {
    tracing::info_span!(
        "kanban.run",
        "run.scenario" = scenario_id,
        "run.title" = title,
        "run.outcome" = tracing::field::Empty,
    )
}

/// Record how the run ended on its span.
pub fn record_outcome(span: &Span, outcome: Outcome) {
    span.record("run.outcome", tracing::field::display(outcome));
    span.in_scope(|| {
        tracing::info!(outcome = %outcome, "run_outcome");
    });
}
