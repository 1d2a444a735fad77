use crate::task::DEFAULT_MINUTES_PER_DAY;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;
use thiserror::Error;

pub const ENV_MAX_ITERATIONS: &str = "TASKFLOW_MAX_ITERATIONS";
pub const ENV_TIME_LIMIT_MS: &str = "TASKFLOW_TIME_LIMIT_MS";
pub const ENV_ALLOW_SPLIT: &str = "TASKFLOW_ALLOW_SPLIT";
pub const ENV_HARD_DEADLINES: &str = "TASKFLOW_HARD_DEADLINES";
pub const ENV_HORIZON_DAYS: &str = "TASKFLOW_HORIZON_DAYS";
pub const ENV_PARALLEL: &str = "TASKFLOW_PARALLEL";

/// Longest searchable horizon, one hundred years.
pub const MAX_HORIZON_DAYS: u32 = 36_525;
/// Upper bound of every optimization weight.
pub const MAX_WEIGHT: u32 = 100;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid value '{value}' for {key}")]
    InvalidValue { key: &'static str, value: String },
}

/// Solver knobs. Iteration and time limits of 0 disable that bound.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolveConfig {
    /// Allow one task to spread over several bucket windows of a resource.
    pub allow_split_across_buckets: bool,
    /// Upper bound on slot checks for one solve.
    pub max_iterations: u64,
    pub time_limit_ms: u64,
    /// Treat a missed deadline as unplaceable instead of a violation.
    pub hard_deadlines: bool,
    /// Only ever place a task on its assignee.
    pub strict_assignee: bool,
    /// Calendar days after the horizon start that slots are searched in.
    pub horizon_days: u32,
    /// Minutes in a working day, used when durations are given in days.
    pub minutes_per_day: i64,
    /// Run the critical path analysis alongside the solve.
    pub enable_parallelization: bool,
    pub weights: OptimizationWeights,
}

/// Relative importance (0..=100) of the terms that rank candidate slots.
///
/// A missed deadline costs `deadline` and leaving the assignee costs
/// `resource`, both counted in working days. Every minute a slot ends later
/// than the best candidate costs a base amount raised by `priority` for
/// urgent tasks and by `dependency` for tasks that others wait on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizationWeights {
    pub priority: u32,
    pub deadline: u32,
    pub resource: u32,
    pub dependency: u32,
}

impl Default for OptimizationWeights {
    fn default() -> Self {
        Self {
            priority: 70,
            deadline: 80,
            resource: 60,
            dependency: 90,
        }
    }
}

impl Default for SolveConfig {
    fn default() -> Self {
        Self {
            allow_split_across_buckets: false,
            max_iterations: 100_000,
            time_limit_ms: 300_000,
            hard_deadlines: false,
            strict_assignee: false,
            horizon_days: 365,
            minutes_per_day: DEFAULT_MINUTES_PER_DAY,
            enable_parallelization: true,
            weights: OptimizationWeights::default(),
        }
    }
}

impl SolveConfig {
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let file = File::open(path)?;
        Ok(serde_json::from_reader(file)?)
    }

    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Applies `TASKFLOW_*` overrides resolved through `lookup`.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_MAX_ITERATIONS) {
            self.max_iterations = parse_value(ENV_MAX_ITERATIONS, &value)?;
        }
        if let Some(value) = lookup(ENV_TIME_LIMIT_MS) {
            self.time_limit_ms = parse_value(ENV_TIME_LIMIT_MS, &value)?;
        }
        if let Some(value) = lookup(ENV_ALLOW_SPLIT) {
            self.allow_split_across_buckets = parse_flag(ENV_ALLOW_SPLIT, &value)?;
        }
        if let Some(value) = lookup(ENV_HARD_DEADLINES) {
            self.hard_deadlines = parse_flag(ENV_HARD_DEADLINES, &value)?;
        }
        if let Some(value) = lookup(ENV_HORIZON_DAYS) {
            self.horizon_days = parse_value(ENV_HORIZON_DAYS, &value)?;
        }
        if let Some(value) = lookup(ENV_PARALLEL) {
            self.enable_parallelization = parse_flag(ENV_PARALLEL, &value)?;
        }
        Ok(self)
    }

    /// Rejects values the solver cannot search with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.horizon_days > MAX_HORIZON_DAYS {
            return Err(out_of_range("horizon_days", self.horizon_days));
        }
        if !(1..=24 * 60).contains(&self.minutes_per_day) {
            return Err(out_of_range("minutes_per_day", self.minutes_per_day));
        }
        let weights = [
            ("weights.priority", self.weights.priority),
            ("weights.deadline", self.weights.deadline),
            ("weights.resource", self.weights.resource),
            ("weights.dependency", self.weights.dependency),
        ];
        for (key, weight) in weights {
            if weight > MAX_WEIGHT {
                return Err(out_of_range(key, weight));
            }
        }
        Ok(())
    }
}

fn out_of_range(key: &'static str, value: impl ToString) -> ConfigError {
    ConfigError::InvalidValue {
        key,
        value: value.to_string(),
    }
}

fn parse_value<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse::<T>()
        .map_err(|_| ConfigError::InvalidValue {
            key,
            value: value.to_string(),
        })
}

fn parse_flag(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key,
            value: value.to_string(),
        }),
    }
}
