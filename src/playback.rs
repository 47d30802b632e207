//! Real-time playback: drive a simulation from wall-clock ticks.
//!
//! Each tick advances the simulated clock by the same amount of time, then
//! hands the simulation to the caller for polling (render, chart, print).

use std::time::Duration;

use crate::model::SimTime;
use crate::simulation::{Outcome, Simulation};

/// Play `sim` live until it is done or stalls.
///
/// `on_tick` runs after every tick, including the last one.
pub async fn play<F>(sim: &mut Simulation, tick: Duration, mut on_tick: F) -> Outcome
where
    F: FnMut(&Simulation),
{
    let tick = tick.max(Duration::from_millis(1));
    let step = tick.as_millis() as SimTime;
    let mut interval = tokio::time::interval(tick);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        interval.tick().await;
        sim.advance_by(step);
        on_tick(sim);
        if let Some(outcome) = sim.outcome() {
            return outcome;
        }
    }
}
