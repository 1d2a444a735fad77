use crate::constraints::ConstraintSet;
use crate::critical_path::{CriticalPath, TaskTiming};
use crate::solver::{ScheduleResult, SolveStatus, Violation};
use crate::task::{BucketId, ResourceId, Task, TaskId};
use chrono::{Duration, NaiveDateTime};
use polars::df;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

/// One assignment decorated with display names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentRow {
    pub task_id: TaskId,
    pub task_name: String,
    pub resource_id: ResourceId,
    pub resource_name: String,
    pub bucket_id: BucketId,
    pub bucket_name: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub segment: u32,
    pub start_offset_minutes: i64,
    pub end_offset_minutes: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceUtilization {
    pub resource_id: ResourceId,
    pub resource_name: String,
    pub booked_minutes: i64,
    /// Bookable minutes from the horizon start through the makespan.
    pub available_minutes: i64,
    pub utilization_percent: f64,
}

/// Row handed to a task tracker connector: one per placed task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteBackRow {
    pub task_id: TaskId,
    pub task_name: String,
    pub resource_id: ResourceId,
    pub bucket_id: BucketId,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub segments: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleReport {
    pub status: SolveStatus,
    pub horizon_start: NaiveDateTime,
    pub makespan_minutes: i64,
    pub assignments: Vec<AssignmentRow>,
    pub violations: Vec<Violation>,
    #[serde(default)]
    pub unscheduled: Vec<TaskId>,
    pub critical_path: Vec<TaskId>,
    pub critical_path_minutes: i64,
    pub slack: Vec<TaskTiming>,
    pub utilization: Vec<ResourceUtilization>,
    #[serde(default)]
    pub iterations: u64,
}

impl ScheduleReport {
    pub fn build(
        tasks: &[Task],
        constraints: &ConstraintSet,
        result: &ScheduleResult,
        critical_path: &CriticalPath,
    ) -> Self {
        let task_names: HashMap<&str, &str> = tasks
            .iter()
            .map(|t| (t.id.as_str(), t.name.as_str()))
            .collect();
        let horizon_start = result.horizon_start;

        let mut assignments: Vec<AssignmentRow> = result
            .assignments
            .iter()
            .map(|a| AssignmentRow {
                task_id: a.task_id.clone(),
                task_name: task_names
                    .get(a.task_id.as_str())
                    .map(|n| n.to_string())
                    .unwrap_or_default(),
                resource_id: a.resource_id.clone(),
                resource_name: constraints
                    .resource(&a.resource_id)
                    .map(|r| r.name.clone())
                    .unwrap_or_default(),
                bucket_id: a.bucket_id.clone(),
                bucket_name: constraints
                    .bucket(&a.bucket_id)
                    .map(|b| b.name.clone())
                    .unwrap_or_default(),
                start: a.start,
                end: a.end,
                segment: a.segment,
                start_offset_minutes: (a.start - horizon_start).num_minutes(),
                end_offset_minutes: (a.end - horizon_start).num_minutes(),
            })
            .collect();
        assignments.sort_by(|a, b| {
            a.start
                .cmp(&b.start)
                .then_with(|| a.resource_id.cmp(&b.resource_id))
                .then_with(|| a.task_id.cmp(&b.task_id))
                .then_with(|| a.segment.cmp(&b.segment))
        });

        Self {
            status: result.status,
            horizon_start,
            makespan_minutes: result.makespan_minutes,
            utilization: utilization(constraints, result),
            assignments,
            violations: result.violations.clone(),
            unscheduled: result.unscheduled.clone(),
            critical_path: critical_path.path.clone(),
            critical_path_minutes: critical_path.total_minutes,
            slack: critical_path.timings.clone(),
            iterations: result.iterations,
        }
    }

    /// Anything short of a clean optimal schedule.
    pub fn needs_attention(&self) -> bool {
        self.status != SolveStatus::Optimal
    }

    pub fn is_blocking(&self) -> bool {
        self.status == SolveStatus::Infeasible
    }

    pub fn to_cli_summary(&self) -> String {
        let mut parts = Vec::new();
        parts.push(format!("status={}", self.status));
        parts.push(format!("makespan={}min", self.makespan_minutes));
        parts.push(format!("assignments={}", self.assignments.len()));
        if !self.violations.is_empty() {
            parts.push(format!("violations={}", self.violations.len()));
        }
        if !self.unscheduled.is_empty() {
            parts.push(format!("unscheduled={}", self.unscheduled.len()));
        }
        if !self.critical_path.is_empty() {
            parts.push(format!("crit_path={}", self.critical_path.join("->")));
        }
        parts.join(", ")
    }

    /// Assignments as a frame with start/end offsets and segment duration,
    /// sorted by start.
    pub fn timeline_frame(&self) -> PolarsResult<DataFrame> {
        let rows = &self.assignments;
        let frame = df!(
            "task_id" => rows.iter().map(|r| r.task_id.clone()).collect::<Vec<_>>(),
            "task" => rows.iter().map(|r| r.task_name.clone()).collect::<Vec<_>>(),
            "resource" => rows.iter().map(|r| r.resource_id.clone()).collect::<Vec<_>>(),
            "bucket" => rows.iter().map(|r| r.bucket_id.clone()).collect::<Vec<_>>(),
            "start" => rows.iter().map(|r| r.start.format(TIMESTAMP_FORMAT).to_string()).collect::<Vec<_>>(),
            "end" => rows.iter().map(|r| r.end.format(TIMESTAMP_FORMAT).to_string()).collect::<Vec<_>>(),
            "start_offset_min" => rows.iter().map(|r| r.start_offset_minutes).collect::<Vec<i64>>(),
            "end_offset_min" => rows.iter().map(|r| r.end_offset_minutes).collect::<Vec<i64>>()
        )?;

        frame
            .lazy()
            .with_column((col("end_offset_min") - col("start_offset_min")).alias("duration_min"))
            .collect()
    }

    pub fn slack_frame(&self) -> PolarsResult<DataFrame> {
        slack_frame(&self.slack)
    }

    pub fn write_back_rows(&self) -> Vec<WriteBackRow> {
        let mut rows: Vec<WriteBackRow> = Vec::new();
        let mut index: HashMap<&str, usize> = HashMap::new();
        for row in &self.assignments {
            match index.get(row.task_id.as_str()) {
                Some(&i) => {
                    let merged = &mut rows[i];
                    merged.start = merged.start.min(row.start);
                    merged.end = merged.end.max(row.end);
                    merged.segments += 1;
                }
                None => {
                    index.insert(row.task_id.as_str(), rows.len());
                    rows.push(WriteBackRow {
                        task_id: row.task_id.clone(),
                        task_name: row.task_name.clone(),
                        resource_id: row.resource_id.clone(),
                        bucket_id: row.bucket_id.clone(),
                        start: row.start,
                        end: row.end,
                        segments: 1,
                    });
                }
            }
        }
        rows
    }

    pub fn utilization_for(&self, resource_id: &str) -> Option<&ResourceUtilization> {
        self.utilization.iter().find(|u| u.resource_id == resource_id)
    }
}

/// Per-task slack table for display.
pub fn slack_frame(timings: &[TaskTiming]) -> PolarsResult<DataFrame> {
    df!(
        "task_id" => timings.iter().map(|t| t.task_id.clone()).collect::<Vec<_>>(),
        "es" => timings.iter().map(|t| t.earliest_start).collect::<Vec<i64>>(),
        "ef" => timings.iter().map(|t| t.earliest_finish).collect::<Vec<i64>>(),
        "ls" => timings.iter().map(|t| t.latest_start).collect::<Vec<i64>>(),
        "lf" => timings.iter().map(|t| t.latest_finish).collect::<Vec<i64>>(),
        "slack" => timings.iter().map(|t| t.slack).collect::<Vec<i64>>(),
        "critical" => timings.iter().map(|t| t.critical).collect::<Vec<bool>>()
    )
}

fn utilization(constraints: &ConstraintSet, result: &ScheduleResult) -> Vec<ResourceUtilization> {
    let first_day = result.horizon_start.date();
    let last_day = (result.horizon_start + Duration::minutes(result.makespan_minutes)).date();
    let days = if result.makespan_minutes > 0 {
        constraints
            .calendar()
            .count_available_days(first_day, last_day)
    } else {
        0
    };

    constraints
        .resources()
        .iter()
        .map(|resource| {
            let booked_minutes: i64 = result
                .assignments
                .iter()
                .filter(|a| a.resource_id == resource.id)
                .map(|a| a.duration_minutes())
                .sum();
            let daily: i64 = constraints
                .usable_buckets(resource)
                .iter()
                .map(|(_, capacity)| capacity)
                .sum();
            let available_minutes = daily * days;
            let utilization_percent = if available_minutes > 0 {
                booked_minutes as f64 * 100.0 / available_minutes as f64
            } else {
                0.0
            };
            ResourceUtilization {
                resource_id: resource.id.clone(),
                resource_name: resource.name.clone(),
                booked_minutes,
                available_minutes,
                utilization_percent,
            }
        })
        .collect()
}
