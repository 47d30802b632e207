//! Error types for kanban-flow.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("malformed workload entry {entry:?}: expected `skill: effort`")]
    MalformedWorkload { entry: String },

    #[error("invalid effort for skill {skill:?}: {value:?}")]
    InvalidEffort { skill: String, value: String },

    #[error("workload must name at least one skill")]
    EmptyWorkload,

    #[error("invalid {field}: {value:?}")]
    InvalidNumber { field: &'static str, value: String },

    #[error("invalid speed factor: {0}")]
    InvalidSpeed(f64),

    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("scenario file error: {0}")]
    ScenarioFile(#[from] toml::de::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
