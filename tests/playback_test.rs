//! Tests for wall-clock playback.

use kanban_flow::playback::play;
use kanban_flow::scenario::{ScenarioInput, parse_input};
use kanban_flow::simulation::Outcome;
use std::time::Duration;

#[tokio::test]
async fn playback_runs_until_done() {
    let input = ScenarioInput::new("dev", "dev: 1").stories("3").speed(100.0);
    let mut sim = parse_input(&input).unwrap().run();

    let mut ticks = 0u32;
    let mut last_now = 0;
    let outcome = play(&mut sim, Duration::from_millis(5), |sim| {
        assert!(sim.now() > last_now);
        last_now = sim.now();
        ticks += 1;
    })
    .await;

    assert_eq!(outcome, Outcome::Done);
    assert!(sim.is_done());
    // 30 simulated ms at 5 ms per tick.
    assert_eq!(ticks, 6);
    assert_eq!(sim.now(), 30);
}

#[tokio::test]
async fn playback_stops_on_stall() {
    let input = ScenarioInput::new("ux", "ux: 1, dev: 1").stories("1").speed(100.0);
    let mut sim = parse_input(&input).unwrap().run();

    let outcome = play(&mut sim, Duration::from_millis(5), |_| {}).await;
    assert_eq!(outcome, Outcome::Stalled);
    assert_eq!(sim.board().done_stage().size(), 0);
}

#[tokio::test]
async fn zero_tick_still_progresses() {
    let input = ScenarioInput::new("dev", "dev: 1").stories("1").speed(500.0);
    let mut sim = parse_input(&input).unwrap().run();

    let outcome = play(&mut sim, Duration::ZERO, |_| {}).await;
    assert_eq!(outcome, Outcome::Done);
    assert_eq!(sim.now(), 2);
}
