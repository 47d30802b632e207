//! Tests for environment configuration.
//!
//! Everything lives in one test because the environment is process-wide.

use kanban_flow::Error;
use kanban_flow::config::Config;

const VARS: [&str; 4] = ["KANBAN_SPEED", "KANBAN_SEED", "OTEL_ENDPOINT", "LOG_LEVEL"];

fn clear() {
    for var in VARS {
        // SAFETY: this is the only test in the binary, nothing reads the env concurrently.
        unsafe { std::env::remove_var(var) };
    }
}

fn set(var: &str, value: &str) {
    // SAFETY: see `clear`.
    unsafe { std::env::set_var(var, value) };
}

#[test]
fn config_from_env() {
    clear();
    assert_eq!(Config::from_env().unwrap(), Config::default());

    set("KANBAN_SPEED", "4");
    set("KANBAN_SEED", "99");
    set("OTEL_ENDPOINT", "http://localhost:4317");
    set("LOG_LEVEL", "debug");
    let config = Config::from_env().unwrap();
    assert_eq!(config.speed, 4.0);
    assert_eq!(config.seed, Some(99));
    assert_eq!(config.otel_endpoint.as_deref(), Some("http://localhost:4317"));
    assert_eq!(config.log_level, "debug");

    set("OTEL_ENDPOINT", "  ");
    assert_eq!(Config::from_env().unwrap().otel_endpoint, None);

    for bad in ["0", "-1", "fast", "inf"] {
        set("KANBAN_SPEED", bad);
        assert!(
            matches!(Config::from_env(), Err(Error::Config(_))),
            "speed {bad:?} should be rejected"
        );
    }
    set("KANBAN_SPEED", "1.5");

    set("KANBAN_SEED", "-4");
    assert!(matches!(Config::from_env(), Err(Error::Config(_))));

    clear();
}
