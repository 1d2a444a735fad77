//! Resource-free critical path over the dependency graph.

use crate::calculations::{BackwardPass, ForwardPass};
use crate::graph::TaskDag;
use crate::task::{Task, TaskId};
use crate::task_validation::{self, ValidationError};
use serde::{Deserialize, Serialize};

/// Timing of one task in minutes from the project start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskTiming {
    pub task_id: TaskId,
    pub earliest_start: i64,
    pub earliest_finish: i64,
    pub latest_start: i64,
    pub latest_finish: i64,
    pub slack: i64,
    pub critical: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriticalPath {
    pub total_minutes: i64,
    /// Zero-slack chain from a source to a sink.
    pub path: Vec<TaskId>,
    /// One entry per task, in input order.
    pub timings: Vec<TaskTiming>,
}

impl CriticalPath {
    pub fn timing(&self, task_id: &str) -> Option<&TaskTiming> {
        self.timings.iter().find(|t| t.task_id == task_id)
    }

    pub fn slack(&self, task_id: &str) -> Option<i64> {
        self.timing(task_id).map(|t| t.slack)
    }

    pub fn is_critical(&self, task_id: &str) -> bool {
        self.timing(task_id).is_some_and(|t| t.critical)
    }
}

pub fn analyze(tasks: &[Task]) -> Result<CriticalPath, ValidationError> {
    task_validation::validate(tasks)?;
    if tasks.is_empty() {
        return Ok(CriticalPath::default());
    }

    let dag = TaskDag::build(tasks);
    let cycle_error = || ValidationError::CyclicDependency { cycle: Vec::new() };
    let early = ForwardPass::new(tasks, &dag)
        .execute()
        .ok_or_else(cycle_error)?;
    let total_minutes = early.values().map(|&(_, ef)| ef).max().unwrap_or(0);
    let late = BackwardPass::new(tasks, &dag)
        .execute(total_minutes)
        .ok_or_else(cycle_error)?;

    let mut timings = Vec::with_capacity(tasks.len());
    for (position, task) in tasks.iter().enumerate() {
        let (es, ef) = early.get(&position).copied().unwrap_or((0, 0));
        let (ls, lf) = late.get(&position).copied().unwrap_or((es, ef));
        let slack = ls - es;
        timings.push(TaskTiming {
            task_id: task.id.clone(),
            earliest_start: es,
            earliest_finish: ef,
            latest_start: ls,
            latest_finish: lf,
            slack,
            critical: slack == 0,
        });
    }

    let path = trace_path(tasks, &dag, &timings);
    Ok(CriticalPath {
        total_minutes,
        path,
        timings,
    })
}

/// Walks tight zero-slack edges from the lowest-id zero-slack source.
fn trace_path(tasks: &[Task], dag: &TaskDag, timings: &[TaskTiming]) -> Vec<TaskId> {
    let lowest_id = |positions: &mut dyn Iterator<Item = usize>| {
        positions.min_by(|a, b| tasks[*a].id.cmp(&tasks[*b].id))
    };

    let mut sources = (0..tasks.len()).filter(|&p| {
        timings[p].critical
            && timings[p].earliest_start == 0
            && dag
                .node(&tasks[p].id)
                .is_some_and(|n| dag.predecessors(n).next().is_none())
    });
    let Some(mut current) = lowest_id(&mut sources) else {
        return Vec::new();
    };

    let mut path = vec![tasks[current].id.clone()];
    while let Some(node) = dag.node(&tasks[current].id) {
        let finish = timings[current].earliest_finish;
        let mut next = dag.successors(node).map(|n| dag.position(n)).filter(|&p| {
            timings[p].critical && timings[p].earliest_start == finish
        });
        match lowest_id(&mut next) {
            Some(position) => {
                path.push(tasks[position].id.clone());
                current = position;
            }
            None => break,
        }
    }
    path
}
