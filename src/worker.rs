//! Workers: single-item actors with per-skill proficiency.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::event::WorkerRef;
use crate::model::{SimTime, WorkItem, WorkerId};

/// Simulated milliseconds one unit of effort takes at proficiency 1.
pub const BASE_UNIT_MS: f64 = 1000.0;

/// Skill keys that let a worker work on anything, in lookup order.
pub const FALLBACK_SKILLS: [&str; 4] = ["all", "rest", "fs", "fullstack"];

/// Multiplier applied to every completion duration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeScale(f64);

impl TimeScale {
    pub fn multiplier(self) -> f64 {
        self.0
    }

    /// Make the simulation run `factor` times faster.
    pub fn speed_up_by(factor: f64) -> Result<Self> {
        if !factor.is_finite() || factor <= 0.0 {
            return Err(Error::InvalidSpeed(factor));
        }
        Ok(Self(1.0 / factor))
    }
}

impl Default for TimeScale {
    fn default() -> Self {
        Self(1.0)
    }
}

/// A worker on the board.
#[derive(Debug, Clone, Serialize)]
pub struct Worker {
    id: WorkerId,
    name: String,
    /// Effort units per simulated second, per skill.
    skills: BTreeMap<String, f64>,
    idle: bool,
}

impl Worker {
    /// A worker named after its skills, e.g. `"dev, ux"`.
    pub fn new(id: WorkerId, skills: BTreeMap<String, f64>) -> Self {
        let name = skills.keys().cloned().collect::<Vec<_>>().join(", ");
        Self::named(id, name, skills)
    }

    pub fn named(id: WorkerId, name: impl Into<String>, skills: BTreeMap<String, f64>) -> Self {
        Self {
            id,
            name: name.into(),
            skills,
            idle: true,
        }
    }

    pub fn id(&self) -> WorkerId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn skills(&self) -> &BTreeMap<String, f64> {
        &self.skills
    }

    pub fn is_idle(&self) -> bool {
        self.idle
    }

    pub fn worker_ref(&self) -> WorkerRef {
        WorkerRef {
            id: self.id,
            name: self.name.clone(),
        }
    }

    /// Proficiency for `skill` if idle, else 0.
    pub fn can_work_on(&self, skill: &str) -> f64 {
        if !self.idle {
            return 0.0;
        }
        self.proficiency(skill)
    }

    /// Proficiency for `skill` regardless of idleness. 0 means unskilled.
    ///
    /// Falls back to the generalist keys in [`FALLBACK_SKILLS`] order.
    /// Non-positive rates count as absent.
    pub fn proficiency(&self, skill: &str) -> f64 {
        std::iter::once(skill)
            .chain(FALLBACK_SKILLS)
            .filter_map(|key| self.skills.get(key).copied())
            .find(|rate| rate.is_finite() && *rate > 0.0)
            .unwrap_or(0.0)
    }

    /// Simulated time this worker needs for the `skill` part of `item`.
    pub fn duration_for(&self, item: &WorkItem, skill: &str, scale: TimeScale) -> SimTime {
        let proficiency = self.proficiency(skill);
        debug_assert!(proficiency > 0.0, "worker {} cannot do {skill}", self.id);
        let millis = BASE_UNIT_MS * scale.multiplier() * item.effort_for(skill) / proficiency;
        millis.round() as SimTime
    }

    pub(crate) fn set_busy(&mut self) {
        self.idle = false;
    }

    pub(crate) fn set_idle(&mut self) {
        self.idle = true;
    }
}
