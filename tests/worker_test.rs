//! Tests for worker proficiency and completion durations.

use kanban_flow::model::{ItemId, WorkItem, WorkerId};
use kanban_flow::worker::{TimeScale, Worker};
use std::collections::BTreeMap;

fn worker(skills: &[(&str, f64)]) -> Worker {
    Worker::new(
        WorkerId(1),
        skills.iter().map(|(s, r)| (s.to_string(), *r)).collect(),
    )
}

fn item(work: &[(&str, f64)]) -> WorkItem {
    WorkItem::new(
        ItemId(1),
        work.iter().map(|(s, e)| (s.to_string(), *e)).collect(),
        "#66ccff",
    )
}

#[test]
fn exact_skill_wins_over_fallbacks() {
    let w = worker(&[("dev", 2.0), ("all", 5.0)]);
    assert_eq!(w.proficiency("dev"), 2.0);
    assert_eq!(w.proficiency("ux"), 5.0);
}

#[test]
fn fallback_keys_are_checked_in_order() {
    assert_eq!(worker(&[("rest", 2.0), ("all", 3.0)]).proficiency("qa"), 3.0);
    assert_eq!(worker(&[("fullstack", 4.0), ("rest", 2.0)]).proficiency("qa"), 2.0);
    assert_eq!(worker(&[("fs", 1.5), ("fullstack", 4.0)]).proficiency("qa"), 1.5);
    assert_eq!(worker(&[("fullstack", 4.0)]).proficiency("qa"), 4.0);
}

#[test]
fn zero_rate_falls_through_to_fallback() {
    let w = worker(&[("dev", 0.0), ("all", 1.0)]);
    assert_eq!(w.proficiency("dev"), 1.0);
}

#[test]
fn unskilled_worker_scores_zero() {
    let w = worker(&[("ux", 1.0)]);
    assert_eq!(w.proficiency("dev"), 0.0);
    assert_eq!(w.can_work_on("dev"), 0.0);
}

#[test]
fn idle_worker_reports_proficiency() {
    let w = worker(&[("dev", 1.5)]);
    assert!(w.is_idle());
    assert_eq!(w.can_work_on("dev"), 1.5);
}

#[test]
fn name_lists_skills() {
    let w = worker(&[("ux", 1.0), ("dev", 1.0)]);
    assert_eq!(w.name(), "dev, ux");
    assert_eq!(w.worker_ref().name, "dev, ux");
}

#[test]
fn duration_is_effort_over_proficiency() {
    let task = item(&[("dev", 1.5)]);
    let w = worker(&[("dev", 1.0)]);
    assert_eq!(w.duration_for(&task, "dev", TimeScale::default()), 1500);
}

#[test]
fn doubling_proficiency_halves_duration() {
    let task = item(&[("dev", 3.0)]);
    let slow = worker(&[("dev", 1.0)]);
    let fast = worker(&[("dev", 2.0)]);

    let slow_ms = slow.duration_for(&task, "dev", TimeScale::default());
    let fast_ms = fast.duration_for(&task, "dev", TimeScale::default());
    assert_eq!(slow_ms, 3000);
    assert_eq!(fast_ms * 2, slow_ms);
}

#[test]
fn speed_up_shrinks_duration() {
    let task = item(&[("dev", 1.0)]);
    let w = worker(&[("dev", 1.0)]);
    let scale = TimeScale::speed_up_by(4.0).unwrap();
    assert_eq!(scale.multiplier(), 0.25);
    assert_eq!(w.duration_for(&task, "dev", scale), 250);
}

#[test]
fn missing_effort_takes_no_time() {
    let task = item(&[("ux", 1.0)]);
    let w = worker(&[("dev", 1.0)]);
    assert_eq!(w.duration_for(&task, "dev", TimeScale::default()), 0);
}

#[test]
fn invalid_speed_factors_are_rejected() {
    assert!(TimeScale::speed_up_by(0.0).is_err());
    assert!(TimeScale::speed_up_by(-2.0).is_err());
    assert!(TimeScale::speed_up_by(f64::NAN).is_err());
    assert!(TimeScale::speed_up_by(f64::INFINITY).is_err());
}
