//! Typed configuration from environment variables.
//!
//! Loads once at startup and fails fast on values that do not parse.
//! Every variable is optional.

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Speed factor applied to every run (`KANBAN_SPEED`).
    pub speed: f64,
    /// Seed for randomized workloads (`KANBAN_SEED`).
    pub seed: Option<u64>,
    pub otel_endpoint: Option<String>,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            speed: 1.0,
            seed: None,
            otel_endpoint: None,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// In local dev, call `dotenvy::dotenv().ok()` before this.
    pub fn from_env() -> Result<Self> {
        let speed = match optional_var("KANBAN_SPEED") {
            Some(raw) => raw
                .parse::<f64>()
                .ok()
                .filter(|s| s.is_finite() && *s > 0.0)
                .ok_or_else(|| {
                    Error::Config(format!("KANBAN_SPEED must be a positive number, got {raw:?}"))
                })?,
            None => 1.0,
        };

        let seed = match optional_var("KANBAN_SEED") {
            Some(raw) => Some(raw.parse::<u64>().map_err(|_| {
                Error::Config(format!("KANBAN_SEED must be an unsigned integer, got {raw:?}"))
            })?),
            None => None,
        };

        Ok(Self {
            speed,
            seed,
            otel_endpoint: optional_var("OTEL_ENDPOINT"),
            log_level: optional_var("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }
}

/// A set, non-blank environment variable.
fn optional_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
