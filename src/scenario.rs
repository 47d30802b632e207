//! Scenario parsing and backlog generation.
//!
//! A scenario is the declarative description of one run: who works, how much
//! effort each story needs per skill, how many stories, and the WIP limit.
//! Parsing validates everything up front; [`ScenarioConfig::run`] then builds
//! the board, hires the workers and fills the backlog.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::board::Board;
use crate::error::{Error, Result};
use crate::model::{IdAllocator, WorkItem};
use crate::simulation::Simulation;
use crate::stats::Stats;
use crate::worker::{TimeScale, Worker};

pub const DEFAULT_STORY_COUNT: usize = 50;

/// Lower bound for randomized effort, so no item takes zero time.
pub const MIN_RANDOM_EFFORT: f64 = 0.1;

const UNLIMITED: [&str; 2] = ["none", "unlimited"];

static NEXT_SCENARIO_ID: AtomicU64 = AtomicU64::new(1);

/// Process-wide scenario numbering, starting at 1.
fn next_scenario_id() -> u64 {
    NEXT_SCENARIO_ID.fetch_add(1, Ordering::Relaxed)
}

const CARD_COLORS: [&str; 6] = [
    "#ffcc00", // yellow
    "#ff66b3", // pink
    "#66ccff", // light blue
    "#99ff99", // light green
    "#ff9966", // orange
    "#cc99ff", // purple
];

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// Raw scenario description, as typed into a form or a scenario file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScenarioInput {
    #[serde(default)]
    pub title: Option<String>,

    /// Comma-separated worker names, each naming the worker's one skill.
    pub workers: String,

    /// Comma-separated `skill: effort` pairs. Order defines the stages.
    pub workload: String,

    /// Maximum items in progress. Empty, `none` or `unlimited` means no limit.
    #[serde(default, deserialize_with = "text_or_number")]
    pub wip_limit: Option<String>,

    #[serde(default, rename = "stories", deserialize_with = "text_or_number")]
    pub number_of_stories: Option<String>,

    #[serde(default)]
    pub random: bool,

    /// Seed for randomized effort and card colours.
    #[serde(default)]
    pub seed: Option<u64>,

    /// Simulation speed factor.
    #[serde(default)]
    pub speed: Option<f64>,
}

impl ScenarioInput {
    pub fn new(workers: impl Into<String>, workload: impl Into<String>) -> Self {
        Self {
            workers: workers.into(),
            workload: workload.into(),
            ..Self::default()
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn stories(mut self, stories: impl Into<String>) -> Self {
        self.number_of_stories = Some(stories.into());
        self
    }

    pub fn wip_limit(mut self, limit: impl Into<String>) -> Self {
        self.wip_limit = Some(limit.into());
        self
    }

    pub fn random(mut self, random: bool) -> Self {
        self.random = random;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn speed(mut self, speed: f64) -> Self {
        self.speed = Some(speed);
        self
    }
}

/// Accept `stories = 20` as well as `stories = "20"`.
fn text_or_number<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(i64),
    }

    Ok(Option::<Raw>::deserialize(deserializer)?.map(|raw| match raw {
        Raw::Text(text) => text,
        Raw::Number(n) => n.to_string(),
    }))
}

#[derive(Debug, Deserialize)]
struct ScenarioFile {
    #[serde(default)]
    scenario: Vec<ScenarioInput>,
}

// ---------------------------------------------------------------------------
// Parsed configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct WorkerConfig {
    pub name: String,
    pub skills: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stories {
    pub amount: usize,
    /// Base effort per skill, in stage order.
    pub work: Vec<(String, f64)>,
}

/// How each story's effort is derived from the configured base effort.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EffortDistribution {
    Fixed,
    /// Base effort plus `sqrt(lambda)` times the sum of three uniform draws
    /// on `[-1, 1)`, floored at [`MIN_RANDOM_EFFORT`].
    PseudoNormal { lambda: f64 },
}

impl EffortDistribution {
    pub fn sample<R: Rng + ?Sized>(&self, value: f64, rng: &mut R) -> f64 {
        match *self {
            EffortDistribution::Fixed => value,
            EffortDistribution::PseudoNormal { lambda } => {
                let normal: f64 = (0..3).map(|_| rng.gen_range(-1.0_f64..1.0)).sum();
                (value + normal * lambda.sqrt()).max(MIN_RANDOM_EFFORT)
            }
        }
    }
}

/// A validated scenario.
///
/// Call [`ScenarioConfig::run`] once per run; each call builds a fresh board.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioConfig {
    pub id: u64,
    pub title: String,
    pub workers: Vec<WorkerConfig>,
    pub stories: Stories,
    pub wip_limit: usize,
    pub distribution: EffortDistribution,
    pub seed: Option<u64>,
    pub time_scale: TimeScale,
}

impl ScenarioConfig {
    /// Parse and validate a scenario. Fails before anything is built.
    ///
    /// Every successful parse takes the next scenario id.
    pub fn parse(input: &ScenarioInput) -> Result<Self> {
        let work = parse_workload(&input.workload)?;
        let workers = parse_workers(&input.workers);

        let amount = match blank_to_none(input.number_of_stories.as_deref()) {
            Some(text) => parse_count("story count", text)?,
            None => DEFAULT_STORY_COUNT,
        };

        let wip_limit = match blank_to_none(input.wip_limit.as_deref()) {
            Some(text) if UNLIMITED.iter().any(|u| text.eq_ignore_ascii_case(u)) => amount,
            Some(text) => match parse_count("WIP limit", text)? {
                0 => {
                    return Err(Error::InvalidNumber {
                        field: "WIP limit",
                        value: text.to_string(),
                    });
                }
                limit => limit,
            },
            None => amount,
        };

        let time_scale = match input.speed {
            Some(factor) => TimeScale::speed_up_by(factor)?,
            None => TimeScale::default(),
        };

        let title = input
            .title
            .clone()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| input.workload.trim().to_string());

        Ok(Self {
            id: next_scenario_id(),
            title,
            workers,
            stories: Stories { amount, work },
            wip_limit,
            distribution: if input.random {
                EffortDistribution::PseudoNormal { lambda: 1.0 }
            } else {
                EffortDistribution::Fixed
            },
            seed: input.seed,
            time_scale,
        })
    }

    /// Skills in stage order.
    pub fn skills(&self) -> Vec<&str> {
        self.stories.work.iter().map(|(skill, _)| skill.as_str()).collect()
    }

    /// Build the board, hire the workers and fill the backlog.
    pub fn run(&self) -> Simulation {
        let mut board = Board::new(self.skills().as_slice());
        board.set_time_scale(self.time_scale);
        // A limit at or above the story count can never bind.
        board.set_wip_limit((self.wip_limit < self.stories.amount).then_some(self.wip_limit));
        let stats = Stats::attach(&mut board);

        let workers: Vec<Worker> = self
            .workers
            .iter()
            .map(|config| {
                let id = board.ids_mut().next_worker();
                Worker::named(id, config.name.clone(), config.skills.clone())
            })
            .collect();
        board.add_workers(workers);

        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let items = generate_work_items(board.ids_mut(), self.stories.amount, &mut rng, |rng| {
            self.stories
                .work
                .iter()
                .map(|(skill, base)| (skill.clone(), self.distribution.sample(*base, rng)))
                .collect()
        });
        board.add_work_items(items);

        Simulation::new(self.id, self.title.clone(), board, stats)
    }
}

/// Parse a form-style input.
pub fn parse_input(input: &ScenarioInput) -> Result<ScenarioConfig> {
    ScenarioConfig::parse(input)
}

/// Parse every `[[scenario]]` table of a TOML document, in file order.
pub fn parse_scenarios(text: &str) -> Result<Vec<ScenarioConfig>> {
    let file: ScenarioFile = toml::from_str(text)?;
    file.scenario.iter().map(ScenarioConfig::parse).collect()
}

pub fn load_scenarios(path: &Path) -> Result<Vec<ScenarioConfig>> {
    let text = std::fs::read_to_string(path)?;
    parse_scenarios(&text)
}

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

pub fn any_card_color<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    CARD_COLORS.choose(rng).copied().unwrap_or(CARD_COLORS[0])
}

/// Create `amount` items, asking `story` for each item's effort.
pub fn generate_work_items<R: Rng>(
    ids: &mut IdAllocator,
    amount: usize,
    rng: &mut R,
    mut story: impl FnMut(&mut R) -> BTreeMap<String, f64>,
) -> Vec<WorkItem> {
    (0..amount)
        .map(|_| {
            let work = story(&mut *rng);
            WorkItem::new(ids.next_item(), work, any_card_color(rng))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Parsing helpers
// ---------------------------------------------------------------------------

fn blank_to_none(text: Option<&str>) -> Option<&str> {
    text.map(str::trim).filter(|t| !t.is_empty())
}

fn parse_count(field: &'static str, text: &str) -> Result<usize> {
    text.trim().parse().map_err(|_| Error::InvalidNumber {
        field,
        value: text.to_string(),
    })
}

/// `"ux: 1, dev: 2"` into ordered `(skill, effort)` pairs.
///
/// A repeated skill keeps its first position and takes the last effort.
fn parse_workload(workload: &str) -> Result<Vec<(String, f64)>> {
    let mut work: Vec<(String, f64)> = Vec::new();

    for entry in workload.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let Some((skill, value)) = entry.split_once(':') else {
            return Err(Error::MalformedWorkload {
                entry: entry.to_string(),
            });
        };
        let skill = skill.trim();
        if skill.is_empty() {
            return Err(Error::MalformedWorkload {
                entry: entry.to_string(),
            });
        }

        let effort = value
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|e| e.is_finite() && *e >= 0.0)
            .ok_or_else(|| Error::InvalidEffort {
                skill: skill.to_string(),
                value: value.trim().to_string(),
            })?;

        match work.iter_mut().find(|(s, _)| s == skill) {
            Some(existing) => existing.1 = effort,
            None => work.push((skill.to_string(), effort)),
        }
    }

    if work.is_empty() {
        return Err(Error::EmptyWorkload);
    }
    Ok(work)
}

/// One single-skill worker per name. Repeated names get a number: `dev`, `dev 2`.
fn parse_workers(workers: &str) -> Vec<WorkerConfig> {
    let mut seen: BTreeMap<&str, usize> = BTreeMap::new();

    workers
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(|skill| {
            let count = seen.entry(skill).or_insert(0);
            *count += 1;
            let name = if *count == 1 {
                skill.to_string()
            } else {
                format!("{skill} {count}")
            };
            WorkerConfig {
                name,
                skills: BTreeMap::from([(skill.to_string(), 1.0)]),
            }
        })
        .collect()
}
