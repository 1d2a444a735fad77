use crate::planner::SchedulingInput;
use crate::report::ScheduleReport;
use crate::task_validation::{self, ValidationError};
use serde_json::Error as SerdeJsonError;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("serialization error: {0}")]
    Serialization(#[from] SerdeJsonError),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[cfg(feature = "sqlite")]
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("invalid tasks: {0}")]
    Validation(#[from] ValidationError),
    #[error("invalid data: {0}")]
    InvalidData(String),
    #[error("no report stored")]
    NotFound,
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// Run history of solved reports.
pub trait ReportStore {
    /// Appends a report and returns its run id.
    fn save_report(&self, report: &ScheduleReport) -> PersistenceResult<i64>;
    fn load_latest_report(&self) -> PersistenceResult<Option<ScheduleReport>>;
    fn load_report(&self, run_id: i64) -> PersistenceResult<ScheduleReport>;
    fn run_count(&self) -> PersistenceResult<usize>;
}

/// Task-level checks applied before an input is written or after it is read.
/// Constraint problems are left to solve time so half-edited inputs persist.
pub fn validate_input(input: &SchedulingInput) -> PersistenceResult<()> {
    task_validation::validate(&input.tasks)?;
    Ok(())
}

pub mod file;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use file::{
    TaskFieldMapping, export_write_back_csv, import_tasks_from_csv, load_input_from_json,
    load_report_from_json, save_input_to_json, save_report_to_json, save_tasks_to_csv,
};
