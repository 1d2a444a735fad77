use super::{PersistenceError, PersistenceResult};
use crate::planner::SchedulingInput;
use crate::report::ScheduleReport;
use crate::task::{Priority, Task, TaskId, parse_duration_minutes};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::path::Path;
use tracing::{info, warn};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

pub fn save_input_to_json<P: AsRef<Path>>(input: &SchedulingInput, path: P) -> PersistenceResult<()> {
    super::validate_input(input)?;
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, input)?;
    Ok(())
}

pub fn load_input_from_json<P: AsRef<Path>>(path: P) -> PersistenceResult<SchedulingInput> {
    let file = File::open(path)?;
    let input: SchedulingInput = serde_json::from_reader(file)?;
    super::validate_input(&input)?;
    Ok(input)
}

pub fn save_report_to_json<P: AsRef<Path>>(report: &ScheduleReport, path: P) -> PersistenceResult<()> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, report)?;
    Ok(())
}

pub fn load_report_from_json<P: AsRef<Path>>(path: P) -> PersistenceResult<ScheduleReport> {
    let file = File::open(path)?;
    Ok(serde_json::from_reader(file)?)
}

/// Column names of an external task list. Optional columns that are missing
/// from the file leave the field at its default; a missing id column makes
/// the task name its id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskFieldMapping {
    pub id: String,
    pub name: String,
    pub priority: String,
    pub duration: String,
    pub deadline: String,
    pub assignee: String,
    pub dependencies: String,
    /// "Include in scheduling" flag. Rows with a false value are dropped.
    pub include: String,
}

impl Default for TaskFieldMapping {
    fn default() -> Self {
        Self {
            id: "id".into(),
            name: "name".into(),
            priority: "priority".into(),
            duration: "duration".into(),
            deadline: "deadline".into(),
            assignee: "assignee".into(),
            dependencies: "dependencies".into(),
            include: "include".into(),
        }
    }
}

struct ColumnIndex {
    columns: HashMap<String, usize>,
}

impl ColumnIndex {
    fn new(headers: &csv::StringRecord) -> Self {
        let columns = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.trim().to_ascii_lowercase(), i))
            .collect();
        Self { columns }
    }

    fn has(&self, column: &str) -> bool {
        self.columns.contains_key(&column.trim().to_ascii_lowercase())
    }

    fn get<'r>(&self, record: &'r csv::StringRecord, column: &str) -> &'r str {
        self.columns
            .get(&column.trim().to_ascii_lowercase())
            .and_then(|&i| record.get(i))
            .map(str::trim)
            .unwrap_or("")
    }
}

/// Reads tasks from an external CSV export. Rows whose include flag is false
/// are dropped together with every dependency reference to them.
pub fn import_tasks_from_csv<P: AsRef<Path>>(
    path: P,
    mapping: &TaskFieldMapping,
    minutes_per_day: i64,
) -> PersistenceResult<Vec<Task>> {
    let file = File::open(path)?;
    let mut reader = csv::Reader::from_reader(file);
    let index = ColumnIndex::new(reader.headers()?);
    for required in [&mapping.name, &mapping.duration] {
        if !index.has(required) {
            return Err(PersistenceError::InvalidData(format!(
                "missing column '{required}'"
            )));
        }
    }

    let mut tasks = Vec::new();
    let mut excluded: HashSet<TaskId> = HashSet::new();
    for (row, record) in reader.records().enumerate() {
        let record = record?;
        // Header is line 1
        let line = row + 2;
        let name = index.get(&record, &mapping.name);
        let id = match index.get(&record, &mapping.id) {
            "" => name,
            id => id,
        };
        if id.is_empty() {
            return Err(PersistenceError::InvalidData(format!(
                "line {line}: task has neither id nor name"
            )));
        }
        let include = parse_include(index.get(&record, &mapping.include)).map_err(|value| {
            PersistenceError::InvalidData(format!("line {line}: invalid include flag '{value}'"))
        })?;
        if !include {
            excluded.insert(id.to_string());
            continue;
        }

        let duration = parse_duration_minutes(index.get(&record, &mapping.duration), minutes_per_day)
            .map_err(|err| PersistenceError::InvalidData(format!("line {line}: {err}")))?;
        let mut task = Task::new(id, name, duration);
        task.priority = match index.get(&record, &mapping.priority) {
            "" => Priority::default(),
            value => value
                .parse()
                .map_err(|err| PersistenceError::InvalidData(format!("line {line}: {err}")))?,
        };
        task.deadline = parse_deadline(index.get(&record, &mapping.deadline))
            .map_err(|msg| PersistenceError::InvalidData(format!("line {line}: {msg}")))?;
        task.assignee = match index.get(&record, &mapping.assignee) {
            "" => None,
            assignee => Some(assignee.to_string()),
        };
        task.dependencies = split_list(index.get(&record, &mapping.dependencies));
        tasks.push(task);
    }

    if !excluded.is_empty() {
        for task in &mut tasks {
            let before = task.dependencies.len();
            task.dependencies.retain(|dep| !excluded.contains(dep));
            if task.dependencies.len() != before {
                warn!(
                    task = %task.id,
                    removed = before - task.dependencies.len(),
                    "dropped dependencies on tasks excluded from scheduling"
                );
            }
        }
    }
    info!(imported = tasks.len(), excluded = excluded.len(), "tasks imported from csv");
    Ok(tasks)
}

#[derive(Serialize)]
struct TaskCsvRecord {
    id: String,
    name: String,
    priority: String,
    duration: String,
    deadline: String,
    assignee: String,
    dependencies: String,
    include: String,
}

impl From<&Task> for TaskCsvRecord {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id.clone(),
            name: task.name.clone(),
            priority: task.priority.as_str().to_string(),
            duration: format!("{}m", task.duration_minutes),
            deadline: task
                .deadline
                .map(|d| d.format(TIMESTAMP_FORMAT).to_string())
                .unwrap_or_default(),
            assignee: task.assignee.clone().unwrap_or_default(),
            dependencies: task.dependencies.join(";"),
            include: "true".into(),
        }
    }
}

/// Writes tasks with the column names of [`TaskFieldMapping::default`], so
/// the file can be read back with the default mapping.
pub fn save_tasks_to_csv<P: AsRef<Path>>(tasks: &[Task], path: P) -> PersistenceResult<()> {
    crate::task_validation::validate(tasks)?;
    let file = File::create(path)?;
    let mut writer = csv::Writer::from_writer(file);
    for task in tasks {
        writer.serialize(TaskCsvRecord::from(task))?;
    }
    writer.flush()?;
    Ok(())
}

#[derive(Serialize)]
struct WriteBackCsvRecord {
    task_id: String,
    task_name: String,
    resource_id: String,
    bucket_id: String,
    start: String,
    end: String,
    segments: u32,
}

/// Writes one row per placed task for the tracker write-back connector.
pub fn export_write_back_csv<P: AsRef<Path>>(report: &ScheduleReport, path: P) -> PersistenceResult<usize> {
    let rows = report.write_back_rows();
    let file = File::create(path)?;
    let mut writer = csv::Writer::from_writer(file);
    for row in &rows {
        writer.serialize(WriteBackCsvRecord {
            task_id: row.task_id.clone(),
            task_name: row.task_name.clone(),
            resource_id: row.resource_id.clone(),
            bucket_id: row.bucket_id.clone(),
            start: row.start.format(TIMESTAMP_FORMAT).to_string(),
            end: row.end.format(TIMESTAMP_FORMAT).to_string(),
            segments: row.segments,
        })?;
    }
    writer.flush()?;
    Ok(rows.len())
}

fn parse_include(input: &str) -> Result<bool, String> {
    match input.to_ascii_lowercase().as_str() {
        "" | "true" | "yes" | "y" | "1" | "x" => Ok(true),
        "false" | "no" | "n" | "0" => Ok(false),
        other => Err(other.to_string()),
    }
}

/// Accepts a timestamp or a bare date, which means the end of that day.
fn parse_deadline(input: &str) -> Result<Option<NaiveDateTime>, String> {
    if input.is_empty() {
        return Ok(None);
    }
    for format in [TIMESTAMP_FORMAT, "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(deadline) = NaiveDateTime::parse_from_str(input, format) {
            return Ok(Some(deadline));
        }
    }
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .map(|date| Some(date.and_time(chrono::NaiveTime::MIN) + Duration::days(1)))
        .map_err(|e| format!("invalid deadline '{input}': {e}"))
}

fn split_list(input: &str) -> Vec<String> {
    input
        .split([',', ';'])
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}
