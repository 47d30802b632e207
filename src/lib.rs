//! # kanban-flow
//!
//! Discrete-event simulation of work items flowing across a kanban board.
//!
//! Workers with per-skill proficiency pull items from stage to stage; the
//! board emits an event for every transition, and the stats tracker turns
//! that stream into throughput, lead time and WIP. Time is simulated, so
//! every run is deterministic for a given seed.

pub mod board;
pub mod config;
pub mod error;
pub mod event;
pub mod model;
pub mod playback;
pub mod scenario;
pub mod schedule;
pub mod simulation;
pub mod stage;
pub mod stats;
pub mod telemetry;
pub mod worker;

pub use board::Board;
pub use error::{Error, Result};
pub use scenario::{ScenarioConfig, ScenarioInput, parse_input};
pub use simulation::{Outcome, Simulation};
