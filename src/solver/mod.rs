//! Greedy list scheduler.
//!
//! Tasks are taken in a priority-aware topological order and each one is
//! committed to the earliest slot found on its candidate resources. A slot
//! lies inside one daily bucket window (or several, when splitting is
//! enabled), never overlaps work already committed on the resource and never
//! exceeds the bucket instance's remaining capacity.

mod budget;
mod timeline;

pub use budget::CancelFlag;

use crate::config::{ConfigError, SolveConfig};
use crate::constraints::{ConstraintError, ConstraintSet};
use crate::graph::TaskDag;
use crate::task::{BucketId, ResourceId, Task, TaskId};
use crate::task_validation::{self, ValidationError};
use budget::SolveBudget;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use thiserror::Error;
use timeline::{ResourceTimeline, Segment, SlotFinder, SlotSearch};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SolveStatus {
    Optimal,
    Feasible,
    Infeasible,
    TimedOut,
}

impl SolveStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SolveStatus::Optimal => "Optimal",
            SolveStatus::Feasible => "Feasible",
            SolveStatus::Infeasible => "Infeasible",
            SolveStatus::TimedOut => "TimedOut",
        }
    }

    /// Every task placed.
    pub fn is_success(self) -> bool {
        matches!(self, SolveStatus::Optimal | SolveStatus::Feasible)
    }
}

impl fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InfeasibleReason {
    /// No enabled bucket window on any candidate resource is long enough.
    NoEnabledBucket,
    /// A window is long enough but its capacity leaves too little time.
    InsufficientCapacity,
    /// No free slot before the end of the planning horizon.
    HorizonExhausted,
    /// Every slot ends after the deadline and deadlines are hard.
    DeadlineUnmet,
}

impl fmt::Display for InfeasibleReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            InfeasibleReason::NoEnabledBucket => "no enabled bucket is large enough",
            InfeasibleReason::InsufficientCapacity => "insufficient bucket capacity",
            InfeasibleReason::HorizonExhausted => "no free slot within the planning horizon",
            InfeasibleReason::DeadlineUnmet => "cannot finish before its hard deadline",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub task_id: TaskId,
    pub resource_id: ResourceId,
    pub bucket_id: BucketId,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    /// Position of this piece when the task was split, otherwise 0.
    #[serde(default)]
    pub segment: u32,
}

impl Assignment {
    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }

    pub fn overlaps(&self, other: &Assignment) -> bool {
        self.resource_id == other.resource_id && self.start < other.end && other.start < self.end
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    DeadlineMiss {
        task_id: TaskId,
        deadline: NaiveDateTime,
        finished_at: NaiveDateTime,
        late_by_minutes: i64,
    },
    Unplaceable {
        task_id: TaskId,
        reason: InfeasibleReason,
    },
}

impl Violation {
    pub fn task_id(&self) -> &str {
        match self {
            Violation::DeadlineMiss { task_id, .. } | Violation::Unplaceable { task_id, .. } => {
                task_id
            }
        }
    }

    pub fn is_deadline_miss(&self) -> bool {
        matches!(self, Violation::DeadlineMiss { .. })
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::DeadlineMiss {
                task_id,
                deadline,
                late_by_minutes,
                ..
            } => write!(
                f,
                "task {task_id} misses its deadline {deadline} by {late_by_minutes} min"
            ),
            Violation::Unplaceable { task_id, reason } => {
                write!(f, "task {task_id} cannot be placed: {reason}")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleResult {
    pub status: SolveStatus,
    pub horizon_start: NaiveDateTime,
    /// Latest assignment end minus the horizon start.
    pub makespan_minutes: i64,
    pub assignments: Vec<Assignment>,
    pub violations: Vec<Violation>,
    /// Tasks left without assignments when the solve stopped early.
    #[serde(default)]
    pub unscheduled: Vec<TaskId>,
    /// Slot checks spent.
    #[serde(default)]
    pub iterations: u64,
}

impl ScheduleResult {
    pub fn assignments_for<'a>(&'a self, task_id: &'a str) -> impl Iterator<Item = &'a Assignment> {
        self.assignments.iter().filter(move |a| a.task_id == task_id)
    }

    /// First start and last end over all segments of a task.
    pub fn task_window(&self, task_id: &str) -> Option<(NaiveDateTime, NaiveDateTime)> {
        self.assignments_for(task_id).fold(None, |acc, a| match acc {
            None => Some((a.start, a.end)),
            Some((start, end)) => Some((start.min(a.start), end.max(a.end))),
        })
    }

    /// The task that made the solve infeasible, with the reason.
    pub fn infeasible_task(&self) -> Option<(&str, InfeasibleReason)> {
        self.violations.iter().find_map(|v| match v {
            Violation::Unplaceable { task_id, reason } => Some((task_id.as_str(), *reason)),
            Violation::DeadlineMiss { .. } => None,
        })
    }

    pub fn deadline_misses(&self) -> impl Iterator<Item = &Violation> {
        self.violations.iter().filter(|v| v.is_deadline_miss())
    }
}

#[derive(Debug, Error)]
pub enum SolveError {
    #[error("invalid tasks: {0}")]
    Validation(#[from] ValidationError),
    #[error("invalid constraints: {0}")]
    Constraints(#[from] ConstraintError),
    #[error("invalid solve config: {0}")]
    Config(#[from] ConfigError),
}

/// Base cost of one minute of delay; penalties are expressed in the same unit.
const COST_SCALE: i64 = 100;

struct SlotChoice {
    late_minutes: Option<i64>,
    off_assignee: bool,
    delay_minutes: i64,
}

enum Placement {
    Placed {
        resource: usize,
        segments: Vec<Segment>,
    },
    Unplaceable(InfeasibleReason),
    OutOfBudget,
}

pub struct Solver<'a> {
    constraints: &'a ConstraintSet,
    config: &'a SolveConfig,
    cancel: Option<CancelFlag>,
}

impl<'a> Solver<'a> {
    pub fn new(constraints: &'a ConstraintSet, config: &'a SolveConfig) -> Self {
        Self {
            constraints,
            config,
            cancel: None,
        }
    }

    pub fn with_cancellation(mut self, cancel: CancelFlag) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn solve(&self, tasks: &[Task]) -> Result<ScheduleResult, SolveError> {
        task_validation::validate(tasks)?;
        task_validation::validate_assignees(tasks, self.constraints.resources())?;
        self.constraints.validate()?;
        self.config.validate()?;

        let horizon_start = self.constraints.horizon_start();
        let horizon_end = horizon_start
            .date()
            .checked_add_signed(Duration::days(i64::from(self.config.horizon_days)))
            .unwrap_or(NaiveDate::MAX);
        let finder = SlotFinder::new(
            self.constraints,
            horizon_end,
            self.config.allow_split_across_buckets,
        );
        let mut budget = SolveBudget::new(self.config, self.cancel.clone());

        let dag = TaskDag::build(tasks);
        let order = dag.priority_order(tasks);
        let awaited: HashSet<&str> = tasks
            .iter()
            .flat_map(|t| t.dependencies.iter().map(String::as_str))
            .collect();
        info!(
            tasks = tasks.len(),
            resources = self.constraints.resources().len(),
            buckets = self.constraints.buckets().len(),
            split = self.config.allow_split_across_buckets,
            "solve started"
        );

        let mut timelines: Vec<ResourceTimeline> = self
            .constraints
            .resources()
            .iter()
            .map(|_| ResourceTimeline::default())
            .collect();
        let mut finished: HashMap<&str, NaiveDateTime> = HashMap::with_capacity(tasks.len());
        let mut assignments: Vec<Assignment> = Vec::new();
        let mut violations: Vec<Violation> = Vec::new();
        let mut unscheduled: Vec<TaskId> = Vec::new();
        let mut stopped: Option<SolveStatus> = None;

        for (step, &position) in order.iter().enumerate() {
            let task = &tasks[position];
            let ready = task
                .dependencies
                .iter()
                .filter_map(|dep| finished.get(dep.as_str()).copied())
                .fold(horizon_start, NaiveDateTime::max);

            let remaining = || -> Vec<TaskId> {
                order[step..]
                    .iter()
                    .map(|&p| tasks[p].id.clone())
                    .collect()
            };

            let has_dependents = awaited.contains(task.id.as_str());
            let (resource, segments) = match self.place(
                task,
                has_dependents,
                ready,
                &finder,
                &timelines,
                &mut budget,
            ) {
                Placement::Placed { resource, segments } => (resource, segments),
                Placement::Unplaceable(reason) => {
                    warn!(task = %task.id, %reason, "task cannot be placed");
                    violations.push(Violation::Unplaceable {
                        task_id: task.id.clone(),
                        reason,
                    });
                    unscheduled = remaining();
                    stopped = Some(SolveStatus::Infeasible);
                    break;
                }
                Placement::OutOfBudget => {
                    warn!(
                        task = %task.id,
                        iterations = budget.spent(),
                        "solve budget exhausted"
                    );
                    unscheduled = remaining();
                    stopped = Some(SolveStatus::TimedOut);
                    break;
                }
            };

            let Some(end) = segments.last().map(|s| s.end) else {
                continue;
            };
            if let Some(deadline) = task.deadline {
                if end > deadline {
                    if self.config.hard_deadlines {
                        warn!(task = %task.id, %deadline, "hard deadline cannot be met");
                        violations.push(Violation::Unplaceable {
                            task_id: task.id.clone(),
                            reason: InfeasibleReason::DeadlineUnmet,
                        });
                        unscheduled = remaining();
                        stopped = Some(SolveStatus::Infeasible);
                        break;
                    }
                    let late_by_minutes = (end - deadline).num_minutes();
                    warn!(task = %task.id, %deadline, late_by_minutes, "deadline missed");
                    violations.push(Violation::DeadlineMiss {
                        task_id: task.id.clone(),
                        deadline,
                        finished_at: end,
                        late_by_minutes,
                    });
                }
            }

            let resource_id = &self.constraints.resources()[resource].id;
            for (index, segment) in segments.iter().enumerate() {
                timelines[resource].commit(segment);
                assignments.push(Assignment {
                    task_id: task.id.clone(),
                    resource_id: resource_id.clone(),
                    bucket_id: segment.bucket_id.clone(),
                    start: segment.start,
                    end: segment.end,
                    segment: index as u32,
                });
            }
            debug!(
                task = %task.id,
                resource = %resource_id,
                start = %segments[0].start,
                %end,
                segments = segments.len(),
                "task placed"
            );
            finished.insert(task.id.as_str(), end);
        }

        let status = stopped.unwrap_or(if violations.is_empty() {
            SolveStatus::Optimal
        } else {
            SolveStatus::Feasible
        });
        let makespan_minutes = assignments
            .iter()
            .map(|a| (a.end - horizon_start).num_minutes())
            .max()
            .unwrap_or(0);

        info!(
            %status,
            makespan_minutes,
            placed = finished.len(),
            violations = violations.len(),
            iterations = budget.spent(),
            "solve finished"
        );

        Ok(ScheduleResult {
            status,
            horizon_start,
            makespan_minutes,
            assignments,
            violations,
            unscheduled,
            iterations: budget.spent(),
        })
    }

    /// Assignee first, then every other resource in input order.
    fn candidates(&self, task: &Task) -> Vec<usize> {
        let resources = self.constraints.resources();
        let preferred = task
            .assignee
            .as_deref()
            .and_then(|id| resources.iter().position(|r| r.id == id));
        match preferred {
            Some(index) if self.config.strict_assignee => vec![index],
            Some(index) => std::iter::once(index)
                .chain((0..resources.len()).filter(|&i| i != index))
                .collect(),
            None => (0..resources.len()).collect(),
        }
    }

    fn place(
        &self,
        task: &Task,
        has_dependents: bool,
        ready: NaiveDateTime,
        finder: &SlotFinder<'_>,
        timelines: &[ResourceTimeline],
        budget: &mut SolveBudget,
    ) -> Placement {
        let resources = self.constraints.resources();
        let mut options: Vec<(usize, usize, Vec<Segment>)> = Vec::new();
        let mut reasons: Vec<InfeasibleReason> = Vec::new();

        for (rank, resource) in self.candidates(task).into_iter().enumerate() {
            match finder.earliest_slot(
                &resources[resource],
                &timelines[resource],
                task.duration_minutes,
                ready,
                budget,
            ) {
                SlotSearch::Found(segments) => options.push((rank, resource, segments)),
                SlotSearch::Never(reason) => reasons.push(reason),
                SlotSearch::HorizonExhausted => reasons.push(InfeasibleReason::HorizonExhausted),
                SlotSearch::OutOfBudget => return Placement::OutOfBudget,
            }
        }

        let best_end = options
            .iter()
            .filter_map(|(_, _, segments)| segments.last().map(|s| s.end))
            .min();
        let chosen = options.into_iter().min_by_key(|(rank, _, segments)| {
            let end = segments.last().map(|s| s.end);
            let delay = match (end, best_end) {
                (Some(end), Some(best)) => (end - best).num_minutes(),
                _ => 0,
            };
            let slot = SlotChoice {
                late_minutes: match (task.deadline, end) {
                    (Some(deadline), Some(end)) if end > deadline => {
                        Some((end - deadline).num_minutes())
                    }
                    _ => None,
                },
                off_assignee: task.assignee.is_some() && *rank != 0,
                delay_minutes: delay,
            };
            (self.slot_cost(task, has_dependents, &slot), end, *rank)
        });

        match chosen {
            Some((_, resource, segments)) => Placement::Placed { resource, segments },
            None => Placement::Unplaceable(Self::dominant_reason(&reasons)),
        }
    }

    /// Weighted cost of a candidate slot; the cheapest slot wins.
    fn slot_cost(&self, task: &Task, has_dependents: bool, slot: &SlotChoice) -> i64 {
        let weights = &self.config.weights;
        let day = self.config.minutes_per_day;

        let mut cost: i64 = 0;
        if let Some(late) = slot.late_minutes {
            let penalty = i64::from(weights.deadline).saturating_mul(day.saturating_add(late));
            cost = cost.saturating_add(penalty.saturating_mul(COST_SCALE));
        }
        if slot.off_assignee {
            let penalty = i64::from(weights.resource).saturating_mul(day);
            cost = cost.saturating_add(penalty.saturating_mul(COST_SCALE));
        }

        let urgency = i64::from(3 - task.priority.rank().min(3));
        let mut per_minute = COST_SCALE + i64::from(weights.priority) * urgency;
        if has_dependents {
            per_minute += i64::from(weights.dependency);
        }
        cost.saturating_add(slot.delay_minutes.saturating_mul(per_minute))
    }

    /// Most actionable reason across candidates: a horizon problem beats a
    /// capacity problem, which beats a missing bucket.
    fn dominant_reason(reasons: &[InfeasibleReason]) -> InfeasibleReason {
        if reasons.contains(&InfeasibleReason::HorizonExhausted) {
            InfeasibleReason::HorizonExhausted
        } else if reasons.contains(&InfeasibleReason::InsufficientCapacity) {
            InfeasibleReason::InsufficientCapacity
        } else {
            InfeasibleReason::NoEnabledBucket
        }
    }
}

/// Solves `tasks` against `constraints`. Validation problems are returned as
/// errors before any placement is attempted.
pub fn solve(
    tasks: &[Task],
    constraints: &ConstraintSet,
    config: &SolveConfig,
) -> Result<ScheduleResult, SolveError> {
    Solver::new(constraints, config).solve(tasks)
}
