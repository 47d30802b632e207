//! Metric instrument factories for kanban-flow.
//!
//! Uses the OTel Meter API with the globally-registered `MeterProvider`.
//! Without one installed every instrument is a no-op.

use opentelemetry::metrics::{Counter, Histogram, Meter};

fn meter() -> Meter {
    opentelemetry::global::meter("kanban-flow")
}

/// Counter: items that entered the first work stage.
pub fn items_started() -> Counter<u64> {
    meter()
        .u64_counter("kanban.items.started")
        .with_description("Number of work items started")
        .build()
}

/// Counter: items that reached done.
pub fn items_finished() -> Counter<u64> {
    meter()
        .u64_counter("kanban.items.finished")
        .with_description("Number of work items finished")
        .build()
}

/// Counter: items handed to a worker.
/// Labels: `skill`.
pub fn worker_assignments() -> Counter<u64> {
    meter()
        .u64_counter("kanban.worker.assignments")
        .with_description("Number of items assigned to workers")
        .build()
}

/// Histogram: lead time of finished items in simulated milliseconds.
pub fn lead_time_ms() -> Histogram<f64> {
    meter()
        .f64_histogram("kanban.items.lead_time_ms")
        .with_description("Lead time from first work stage to done")
        .with_unit("ms")
        .build()
}
