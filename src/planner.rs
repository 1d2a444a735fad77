use crate::bucket::Bucket;
use crate::calendar::{WorkCalendar, WorkCalendarConfig};
use crate::config::SolveConfig;
use crate::constraints::ConstraintSet;
use crate::critical_path;
use crate::report::ScheduleReport;
use crate::resource::Resource;
use crate::solver::{CancelFlag, SolveError, Solver};
use crate::task::Task;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Everything one solve needs, in the shape the settings panel saves it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulingInput {
    pub horizon_start: NaiveDateTime,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub resources: Vec<Resource>,
    #[serde(default)]
    pub buckets: Vec<Bucket>,
    #[serde(default)]
    pub calendar: WorkCalendarConfig,
    #[serde(default)]
    pub config: SolveConfig,
}

impl SchedulingInput {
    pub fn new(horizon_start: NaiveDateTime) -> Self {
        Self {
            horizon_start,
            tasks: Vec::new(),
            resources: Vec::new(),
            buckets: Vec::new(),
            calendar: WorkCalendarConfig::default(),
            config: SolveConfig::default(),
        }
    }

    pub fn constraints(&self) -> ConstraintSet {
        ConstraintSet::new(
            self.buckets.clone(),
            self.resources.clone(),
            WorkCalendar::from_config(&self.calendar),
            self.horizon_start,
        )
    }

    pub fn task(&self, task_id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == task_id)
    }

    /// Inserts or replaces by id. Returns `true` when an existing task was replaced.
    pub fn upsert_task(&mut self, task: Task) -> bool {
        match self.tasks.iter_mut().find(|t| t.id == task.id) {
            Some(existing) => {
                *existing = task;
                true
            }
            None => {
                self.tasks.push(task);
                false
            }
        }
    }

    /// Removes a task and every dependency reference to it.
    pub fn remove_task(&mut self, task_id: &str) -> Option<Task> {
        let position = self.tasks.iter().position(|t| t.id == task_id)?;
        let removed = self.tasks.remove(position);
        for task in &mut self.tasks {
            task.dependencies.retain(|dep| dep != task_id);
        }
        Some(removed)
    }

    pub fn upsert_resource(&mut self, resource: Resource) -> bool {
        match self.resources.iter_mut().find(|r| r.id == resource.id) {
            Some(existing) => {
                *existing = resource;
                true
            }
            None => {
                self.resources.push(resource);
                false
            }
        }
    }

    pub fn upsert_bucket(&mut self, bucket: Bucket) -> bool {
        match self.buckets.iter_mut().find(|b| b.id == bucket.id) {
            Some(existing) => {
                *existing = bucket;
                true
            }
            None => {
                self.buckets.push(bucket);
                false
            }
        }
    }
}

/// Runs the solver and the critical path analysis, side by side unless
/// parallelization is disabled, and combines them into a report.
pub fn plan(input: &SchedulingInput) -> Result<ScheduleReport, SolveError> {
    run(input, None)
}

pub fn plan_with_cancellation(
    input: &SchedulingInput,
    cancel: CancelFlag,
) -> Result<ScheduleReport, SolveError> {
    run(input, Some(cancel))
}

fn run(input: &SchedulingInput, cancel: Option<CancelFlag>) -> Result<ScheduleReport, SolveError> {
    let constraints = input.constraints();
    let mut solver = Solver::new(&constraints, &input.config);
    if let Some(cancel) = cancel {
        solver = solver.with_cancellation(cancel);
    }

    let (solved, analyzed) = if input.config.enable_parallelization {
        rayon::join(
            || solver.solve(&input.tasks),
            || critical_path::analyze(&input.tasks),
        )
    } else {
        (
            solver.solve(&input.tasks),
            critical_path::analyze(&input.tasks),
        )
    };
    let result = solved?;
    let critical = analyzed?;

    let report = ScheduleReport::build(&input.tasks, &constraints, &result, &critical);
    info!(summary = %report.to_cli_summary(), "plan ready");
    Ok(report)
}
