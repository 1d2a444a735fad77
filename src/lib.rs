pub mod bucket;
pub mod calculations;
pub mod calendar;
pub mod config;
pub mod constraints;
pub mod critical_path;
pub mod graph;
#[cfg(feature = "http_api")]
pub mod http_api;
pub mod persistence;
pub mod planner;
pub mod report;
pub mod resource;
pub mod snapshot;
pub mod solver;
pub mod task;
pub mod task_validation;

pub use bucket::Bucket;
pub use calendar::{WorkCalendar, WorkCalendarConfig};
pub use config::{ConfigError, OptimizationWeights, SolveConfig};
pub use constraints::{ConstraintError, ConstraintSet};
pub use critical_path::{CriticalPath, TaskTiming};
#[cfg(feature = "sqlite")]
pub use persistence::sqlite::SqliteReportStore;
pub use persistence::{
    PersistenceError, ReportStore, TaskFieldMapping, export_write_back_csv, import_tasks_from_csv,
    load_input_from_json, load_report_from_json, save_input_to_json, save_report_to_json,
    save_tasks_to_csv,
};
pub use planner::{SchedulingInput, plan, plan_with_cancellation};
pub use report::{AssignmentRow, ResourceUtilization, ScheduleReport, WriteBackRow};
pub use resource::Resource;
pub use snapshot::{PublishedSchedule, SnapshotBoard};
pub use solver::{
    Assignment, CancelFlag, InfeasibleReason, ScheduleResult, SolveError, SolveStatus, Solver,
    Violation, solve,
};
pub use task::{MAX_DURATION_MINUTES, Priority, Task, TaskId, parse_duration_minutes};
pub use task_validation::{ErrorKind, ReferenceKind, ValidationError, validate};
