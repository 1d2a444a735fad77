use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub type TaskId = String;
pub type ResourceId = String;
pub type BucketId = String;

/// Minutes in a working day when a duration is written in days (`"1d"`).
pub const DEFAULT_MINUTES_PER_DAY: i64 = 480;

/// Longest accepted task, one hundred calendar years.
pub const MAX_DURATION_MINUTES: i64 = 100 * 366 * 24 * 60;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl Priority {
    /// Scheduling rank: lower ranks are placed first.
    pub fn rank(self) -> u8 {
        match self {
            Priority::Critical => 0,
            Priority::High => 1,
            Priority::Medium => 2,
            Priority::Low => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
            Priority::Critical => "Critical",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = TaskParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" | "med" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            "critical" | "crit" => Ok(Priority::Critical),
            other => Err(TaskParseError::Priority(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskParseError {
    #[error("unknown priority '{0}'")]
    Priority(String),
    #[error("invalid duration '{0}'")]
    Duration(String),
}

/// A unit of schedulable work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub name: String,
    pub duration_minutes: i64,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<NaiveDateTime>,
    /// Preferred resource. Unassigned tasks may land on any resource.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<ResourceId>,
    #[serde(default)]
    pub dependencies: Vec<TaskId>,
    /// Percent complete. Informational only, the solver ignores it.
    #[serde(default)]
    pub progress: u8,
}

impl Task {
    pub fn new(id: impl Into<TaskId>, name: impl Into<String>, duration_minutes: i64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            duration_minutes,
            priority: Priority::default(),
            deadline: None,
            assignee: None,
            dependencies: Vec::new(),
            progress: 0,
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_deadline(mut self, deadline: NaiveDateTime) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_assignee(mut self, assignee: impl Into<ResourceId>) -> Self {
        self.assignee = Some(assignee.into());
        self
    }

    pub fn with_dependencies<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<TaskId>,
    {
        self.dependencies = dependencies.into_iter().map(Into::into).collect();
        self
    }

    pub fn depends_on(&self, other: &str) -> bool {
        self.dependencies.iter().any(|dep| dep == other)
    }
}

/// Parses the duration notations used by task trackers: bare minutes (`"90"`),
/// minutes (`"45m"`), hours (`"2h"`, `"1.5h"`) and working days (`"1d"`).
pub fn parse_duration_minutes(input: &str, minutes_per_day: i64) -> Result<i64, TaskParseError> {
    let trimmed = input.trim().to_ascii_lowercase();
    let invalid = || TaskParseError::Duration(input.to_string());
    if trimmed.is_empty() {
        return Err(invalid());
    }

    let (number, unit_minutes) = if let Some(value) = trimmed.strip_suffix("min") {
        (value, 1.0)
    } else if let Some(value) = trimmed.strip_suffix('m') {
        (value, 1.0)
    } else if let Some(value) = trimmed.strip_suffix('h') {
        (value, 60.0)
    } else if let Some(value) = trimmed.strip_suffix('d') {
        (value, minutes_per_day as f64)
    } else {
        (trimmed.as_str(), 1.0)
    };

    let amount: f64 = number.trim().parse().map_err(|_| invalid())?;
    if !amount.is_finite() || amount <= 0.0 {
        return Err(invalid());
    }
    let minutes = (amount * unit_minutes).round() as i64;
    if minutes <= 0 {
        return Err(invalid());
    }
    Ok(minutes)
}
