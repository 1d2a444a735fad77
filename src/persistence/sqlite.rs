use super::{PersistenceError, PersistenceResult, ReportStore};
use crate::report::ScheduleReport;
use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, params};

/// Append-only history of solve runs in a SQLite file.
pub struct SqliteReportStore {
    connection: Mutex<Connection>,
}

impl SqliteReportStore {
    pub fn new<P: AsRef<std::path::Path>>(path: P) -> PersistenceResult<Self> {
        Self::from_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> PersistenceResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(connection: Connection) -> PersistenceResult<Self> {
        Self::initialize_schema(&connection)?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    fn initialize_schema(connection: &Connection) -> PersistenceResult<()> {
        let ddl = r#"
            CREATE TABLE IF NOT EXISTS solve_runs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                solved_at TEXT NOT NULL,
                status TEXT NOT NULL,
                makespan_minutes INTEGER NOT NULL,
                report_json TEXT NOT NULL
            );
        "#;
        connection.execute_batch(ddl)?;
        Ok(())
    }
}

impl ReportStore for SqliteReportStore {
    fn save_report(&self, report: &ScheduleReport) -> PersistenceResult<i64> {
        let json = serde_json::to_string(report)?;
        let conn = self.connection.lock();
        conn.execute(
            "INSERT INTO solve_runs (solved_at, status, makespan_minutes, report_json)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                Utc::now().to_rfc3339(),
                report.status.as_str(),
                report.makespan_minutes,
                json
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn load_latest_report(&self) -> PersistenceResult<Option<ScheduleReport>> {
        let conn = self.connection.lock();
        let json: Option<String> = conn
            .query_row(
                "SELECT report_json FROM solve_runs ORDER BY id DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;
        json.map(|json| serde_json::from_str(&json).map_err(PersistenceError::from))
            .transpose()
    }

    fn load_report(&self, run_id: i64) -> PersistenceResult<ScheduleReport> {
        let conn = self.connection.lock();
        let json: Option<String> = conn
            .query_row(
                "SELECT report_json FROM solve_runs WHERE id = ?1",
                params![run_id],
                |row| row.get(0),
            )
            .optional()?;
        let json = json.ok_or(PersistenceError::NotFound)?;
        Ok(serde_json::from_str(&json)?)
    }

    fn run_count(&self) -> PersistenceResult<usize> {
        let conn = self.connection.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM solve_runs", [], |row| row.get(0))?;
        usize::try_from(count)
            .map_err(|_| PersistenceError::InvalidData(format!("invalid run count {count}")))
    }
}
