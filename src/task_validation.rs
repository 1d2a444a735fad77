use crate::graph::TaskDag;
use crate::resource::Resource;
use crate::task::{MAX_DURATION_MINUTES, Task, TaskId};
use std::collections::HashSet;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    CyclicDependency,
    UnknownReference,
    DuplicateIdentifier,
    InvalidTask,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    Task,
    Resource,
}

impl std::fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReferenceKind::Task => f.write_str("task"),
            ReferenceKind::Resource => f.write_str("resource"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("duplicate task id {0}")]
    DuplicateIdentifier(TaskId),
    #[error("task {task} references unknown {kind} '{reference}'")]
    UnknownReference {
        task: TaskId,
        reference: String,
        kind: ReferenceKind,
    },
    #[error("cyclic dependency: {}", cycle.join(" -> "))]
    CyclicDependency { cycle: Vec<TaskId> },
    #[error("task {task}: {message}")]
    InvalidTask { task: TaskId, message: String },
}

impl ValidationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ValidationError::DuplicateIdentifier(_) => ErrorKind::DuplicateIdentifier,
            ValidationError::UnknownReference { .. } => ErrorKind::UnknownReference,
            ValidationError::CyclicDependency { .. } => ErrorKind::CyclicDependency,
            ValidationError::InvalidTask { .. } => ErrorKind::InvalidTask,
        }
    }

    fn invalid(task: &Task, message: impl Into<String>) -> Self {
        ValidationError::InvalidTask {
            task: task.id.clone(),
            message: message.into(),
        }
    }
}

pub fn validate_task(task: &Task) -> Result<(), ValidationError> {
    if task.id.trim().is_empty() {
        return Err(ValidationError::invalid(task, "task id must not be empty"));
    }
    if task.duration_minutes <= 0 {
        return Err(ValidationError::invalid(
            task,
            format!("duration {} must be positive", task.duration_minutes),
        ));
    }
    if task.duration_minutes > MAX_DURATION_MINUTES {
        return Err(ValidationError::invalid(
            task,
            format!(
                "duration {} exceeds the limit of {MAX_DURATION_MINUTES} minutes",
                task.duration_minutes
            ),
        ));
    }
    if task.progress > 100 {
        return Err(ValidationError::invalid(
            task,
            format!("progress {} must be between 0 and 100", task.progress),
        ));
    }
    if task.depends_on(&task.id) {
        return Err(ValidationError::CyclicDependency {
            cycle: vec![task.id.clone(), task.id.clone()],
        });
    }
    Ok(())
}

/// Checks identifiers, references and acyclicity of a task set.
pub fn validate(tasks: &[Task]) -> Result<(), ValidationError> {
    let mut seen_ids: HashSet<&str> = HashSet::with_capacity(tasks.len());
    for task in tasks {
        if !seen_ids.insert(task.id.as_str()) {
            return Err(ValidationError::DuplicateIdentifier(task.id.clone()));
        }
        validate_task(task)?;
    }

    for task in tasks {
        if let Some(missing) = task
            .dependencies
            .iter()
            .find(|dep| !seen_ids.contains(dep.as_str()))
        {
            return Err(ValidationError::UnknownReference {
                task: task.id.clone(),
                reference: missing.clone(),
                kind: ReferenceKind::Task,
            });
        }
    }

    let dag = TaskDag::build(tasks);
    if let Some(cycle) = dag.find_cycle(tasks) {
        return Err(ValidationError::CyclicDependency { cycle });
    }
    Ok(())
}

/// Every assignee must name a known resource.
pub fn validate_assignees(tasks: &[Task], resources: &[Resource]) -> Result<(), ValidationError> {
    let known: HashSet<&str> = resources.iter().map(|r| r.id.as_str()).collect();
    for task in tasks {
        if let Some(assignee) = &task.assignee {
            if !known.contains(assignee.as_str()) {
                return Err(ValidationError::UnknownReference {
                    task: task.id.clone(),
                    reference: assignee.clone(),
                    kind: ReferenceKind::Resource,
                });
            }
        }
    }
    Ok(())
}
