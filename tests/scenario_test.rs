//! Tests for scenario parsing, backlog generation and whole runs.

use kanban_flow::Error;
use kanban_flow::event::EventKind;
use kanban_flow::scenario::{
    DEFAULT_STORY_COUNT, EffortDistribution, MIN_RANDOM_EFFORT, ScenarioConfig, ScenarioInput,
    parse_input, parse_scenarios,
};
use kanban_flow::simulation::Outcome;

fn parse(workers: &str, workload: &str) -> Result<ScenarioConfig, Error> {
    parse_input(&ScenarioInput::new(workers, workload))
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

#[test]
fn workload_defines_stage_order() {
    let config = parse("ux, dev", "ux: 1, dev: 2.5").unwrap();
    assert_eq!(config.skills(), vec!["ux", "dev"]);
    assert_eq!(config.stories.work[1], ("dev".to_string(), 2.5));
    assert_eq!(config.title, "ux: 1, dev: 2.5");
}

#[test]
fn each_parse_takes_a_new_id() {
    let first = parse("dev", "dev: 1").unwrap();
    let second = parse("dev", "dev: 1").unwrap();
    assert!(first.id >= 1);
    assert!(second.id > first.id);
    assert_eq!(second.run().scenario_id(), second.id);
}

#[test]
fn defaults_apply_when_fields_are_blank() {
    let config = parse_input(&ScenarioInput::new("dev", "dev: 1").stories(" ").wip_limit("")).unwrap();
    assert_eq!(config.stories.amount, DEFAULT_STORY_COUNT);
    assert_eq!(config.wip_limit, DEFAULT_STORY_COUNT);
    assert_eq!(config.distribution, EffortDistribution::Fixed);
}

#[test]
fn unlimited_wip_means_story_count() {
    for text in ["none", "Unlimited"] {
        let input = ScenarioInput::new("dev", "dev: 1").stories("12").wip_limit(text);
        assert_eq!(parse_input(&input).unwrap().wip_limit, 12);
    }
}

#[test]
fn duplicate_skill_keeps_position_and_last_effort() {
    let config = parse("dev", "ux: 1, dev: 2, ux: 3").unwrap();
    assert_eq!(
        config.stories.work,
        vec![("ux".to_string(), 3.0), ("dev".to_string(), 2.0)]
    );
}

#[test]
fn repeated_worker_names_are_numbered() {
    let config = parse("dev, ux, dev, dev", "ux: 1, dev: 1").unwrap();
    let names: Vec<&str> = config.workers.iter().map(|w| w.name.as_str()).collect();
    assert_eq!(names, vec!["dev", "ux", "dev 2", "dev 3"]);
    assert_eq!(config.workers[2].skills.get("dev"), Some(&1.0));
}

#[test]
fn entry_without_colon_is_malformed() {
    assert!(matches!(
        parse("dev", "ux 1, dev: 2"),
        Err(Error::MalformedWorkload { entry }) if entry == "ux 1"
    ));
    assert!(matches!(parse("dev", ": 2"), Err(Error::MalformedWorkload { .. })));
}

#[test]
fn bad_effort_is_rejected() {
    assert!(matches!(
        parse("dev", "dev: lots"),
        Err(Error::InvalidEffort { skill, .. }) if skill == "dev"
    ));
    assert!(matches!(parse("dev", "dev: -1"), Err(Error::InvalidEffort { .. })));
}

#[test]
fn empty_workload_is_rejected() {
    assert!(matches!(parse("dev", ""), Err(Error::EmptyWorkload)));
    assert!(matches!(parse("dev", " , ,"), Err(Error::EmptyWorkload)));
}

#[test]
fn bad_numbers_are_rejected() {
    let stories = ScenarioInput::new("dev", "dev: 1").stories("many");
    assert!(matches!(
        parse_input(&stories),
        Err(Error::InvalidNumber { field: "story count", .. })
    ));

    for limit in ["0", "-3", "two"] {
        let input = ScenarioInput::new("dev", "dev: 1").wip_limit(limit);
        assert!(
            matches!(parse_input(&input), Err(Error::InvalidNumber { field: "WIP limit", .. })),
            "limit {limit:?} should be rejected"
        );
    }
}

#[test]
fn non_positive_speed_is_rejected() {
    let input = ScenarioInput::new("dev", "dev: 1").speed(0.0);
    assert!(matches!(parse_input(&input), Err(Error::InvalidSpeed(_))));
}

#[test]
fn scenario_file_tables_are_numbered() {
    let text = r#"
[[scenario]]
title = "Pair"
workers = "ux, dev"
workload = "ux: 1, dev: 2"
stories = 2
wip_limit = "none"

[[scenario]]
workers = "dev"
workload = "dev: 1"
stories = "3"
wip_limit = 1
random = true
seed = 7
"#;
    let scenarios = parse_scenarios(text).unwrap();

    assert_eq!(scenarios.len(), 2);
    assert!(scenarios[1].id > scenarios[0].id);
    assert_eq!(scenarios[0].title, "Pair");
    assert_eq!(scenarios[0].wip_limit, 2);
    assert_eq!(scenarios[1].stories.amount, 3);
    assert_eq!(scenarios[1].wip_limit, 1);
    assert_eq!(scenarios[1].seed, Some(7));
    assert!(matches!(scenarios[1].distribution, EffortDistribution::PseudoNormal { .. }));
}

#[test]
fn broken_scenario_file_is_an_error() {
    assert!(matches!(parse_scenarios("[[scenario]]\nworkers = 3"), Err(Error::ScenarioFile(_))));
    assert!(matches!(
        parse_scenarios("[[scenario]]\nworkers = \"dev\"\nworkload = \"dev\""),
        Err(Error::MalformedWorkload { .. })
    ));
}

// ---------------------------------------------------------------------------
// Generation and runs
// ---------------------------------------------------------------------------

#[test]
fn fixed_backlog_copies_base_effort() {
    let input = ScenarioInput::new("ux", "ux: 1, dev: 2").stories("4");
    let sim = parse_input(&input).unwrap().run();

    assert_eq!(sim.board().size(), 4);
    for column in sim.board().items() {
        for item in column {
            assert_eq!(item.effort_for("ux"), 1.0);
            assert_eq!(item.effort_for("dev"), 2.0);
            assert!(item.color.starts_with('#'));
        }
    }
}

#[test]
fn seeded_random_backlog_is_reproducible() {
    let input = ScenarioInput::new("dev", "dev: 1").stories("20").random(true).seed(42);
    let config = parse_input(&input).unwrap();

    let first = config.run();
    let second = config.run();
    assert_eq!(first.board().items(), second.board().items());

    let efforts: Vec<f64> = first
        .board()
        .items()
        .concat()
        .iter()
        .map(|item| item.effort_for("dev"))
        .collect();
    assert_eq!(efforts.len(), 20);
    assert!(efforts.iter().all(|e| *e >= MIN_RANDOM_EFFORT));
    assert!(efforts.iter().any(|e| (e - 1.0).abs() > 1e-9));
}

#[test]
fn pair_scenario_runs_to_expected_report() {
    let input = ScenarioInput::new("ux, dev", "ux: 1, dev: 2").stories("2");
    let mut sim = parse_input(&input).unwrap().run();

    assert_eq!(sim.run_to_completion(), Outcome::Done);
    let report = sim.finish();

    assert_eq!(report.outcome, Outcome::Done);
    assert_eq!(report.finished_at, 5000);
    assert_eq!(report.finished_items, 2);
    assert_eq!(report.peak_wip, 2);
    assert_eq!(report.stats.wip, 0);
    assert_eq!(report.stats.time_worked, 5.0);
    assert!((report.stats.throughput - 34_560.0).abs() < 1e-6);
    assert_eq!(report.stats.workers.get("ux"), Some(&40));
    assert_eq!(report.stats.workers.get("dev"), Some(&40));
    assert!(report.board.done);
}

#[test]
fn wip_limit_one_serializes_the_flow() {
    let input = ScenarioInput::new("ux, dev", "ux: 1, dev: 1").stories("3").wip_limit("1");
    let mut sim = parse_input(&input).unwrap().run();

    assert_eq!(sim.run_to_completion(), Outcome::Done);
    let report = sim.finish();
    assert_eq!(report.peak_wip, 1);
    // Each item waits for the previous one to finish: 3 x (1s + 1s).
    assert_eq!(report.finished_at, 6000);
}

#[test]
fn manual_deny_holds_on_a_limited_scenario() {
    let input = ScenarioInput::new("dev, dev", "dev: 1").stories("6").wip_limit("4");
    let mut sim = parse_input(&input).unwrap().run();
    assert_eq!(sim.board().backlog().size(), 4);

    sim.board_mut().deny_new_work();
    assert_eq!(sim.run_to_completion(), Outcome::Stalled);
    assert_eq!(sim.board().backlog().size(), 4);
    assert_eq!(sim.board().done_stage().size(), 2);
}

#[test]
fn speed_factor_shortens_the_run() {
    let input = ScenarioInput::new("dev", "dev: 1").stories("1").speed(2.0);
    let mut sim = parse_input(&input).unwrap().run();
    sim.run_to_completion();
    assert_eq!(sim.now(), 500);
}

#[test]
fn missing_skill_stalls_the_run() {
    let input = ScenarioInput::new("ux", "ux: 1, dev: 1").stories("2");
    let mut sim = parse_input(&input).unwrap().run();

    assert_eq!(sim.run_to_completion(), Outcome::Stalled);
    let report = sim.finish();
    assert_eq!(report.outcome, Outcome::Stalled);
    assert_eq!(report.finished_items, 0);
    assert_eq!(report.board.columns[2].items.len(), 2);
}

#[test]
fn zero_stories_is_immediately_done() {
    let input = ScenarioInput::new("dev", "dev: 1").stories("0");
    let mut sim = parse_input(&input).unwrap().run();
    assert!(sim.is_done());
    assert!(sim.board().allows_new_work());
    assert!(
        !sim.board()
            .events()
            .history()
            .iter()
            .any(|e| matches!(e.kind, EventKind::BoardDenyNewWork))
    );
    assert_eq!(sim.run_to_completion(), Outcome::Done);
    assert_eq!(sim.now(), 0);
}

#[test]
fn report_serializes_to_json() {
    let input = ScenarioInput::new("dev", "dev: 1").stories("2").title("Solo");
    let mut sim = parse_input(&input).unwrap().run();
    sim.run_to_completion();
    let json = serde_json::to_value(sim.finish()).unwrap();

    assert_eq!(json["title"], "Solo");
    assert_eq!(json["outcome"], "done");
    assert_eq!(json["finished_items"], 2);
}
