use std::{net::SocketAddr, sync::Arc};

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

use crate::config::ConfigError;
use crate::critical_path::{self, CriticalPath};
use crate::persistence::ReportStore;
use crate::planner::{self, SchedulingInput};
use crate::report::ScheduleReport;
use crate::snapshot::{PublishedSchedule, SnapshotBoard};
use crate::solver::SolveError;
use crate::task::Task;
use crate::task_validation::{self, ValidationError};

/// The editable input and a counter bumped on every change to it.
#[derive(Debug)]
struct RevisedInput {
    input: SchedulingInput,
    revision: u64,
}

impl RevisedInput {
    fn edit(&mut self) -> &mut SchedulingInput {
        self.revision += 1;
        &mut self.input
    }
}

#[derive(Clone)]
pub struct AppState {
    input: Arc<RwLock<RevisedInput>>,
    board: Arc<SnapshotBoard>,
    store: Option<Arc<dyn ReportStore + Send + Sync>>,
}

impl AppState {
    pub fn new(input: SchedulingInput) -> Self {
        Self {
            input: Arc::new(RwLock::new(RevisedInput { input, revision: 0 })),
            board: Arc::new(SnapshotBoard::new()),
            store: None,
        }
    }

    /// Every solved report is also appended to `store`.
    pub fn with_store(mut self, store: Arc<dyn ReportStore + Send + Sync>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn board(&self) -> Arc<SnapshotBoard> {
        self.board.clone()
    }

    fn input(&self) -> Arc<RwLock<RevisedInput>> {
        self.input.clone()
    }
}

#[derive(Debug, Serialize)]
struct SolveResponse {
    /// Only complete solves of current input reach the board.
    published: bool,
    generation: Option<u64>,
    input_revision: u64,
    report: ScheduleReport,
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    message: String,
}

#[derive(Debug)]
enum ApiError {
    NotFound(String),
    Conflict(String),
    Invalid(String),
    Internal(String),
}

impl ApiError {
    fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    fn internal(message: impl Into<String>) -> Self {
        ApiError::Internal(message.into())
    }
}

impl From<ValidationError> for ApiError {
    fn from(value: ValidationError) -> Self {
        ApiError::Invalid(value.to_string())
    }
}

impl From<ConfigError> for ApiError {
    fn from(value: ConfigError) -> Self {
        ApiError::Invalid(value.to_string())
    }
}

impl From<SolveError> for ApiError {
    fn from(value: SolveError) -> Self {
        ApiError::Invalid(value.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, message) = match self {
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, "not_found", message),
            ApiError::Conflict(message) => (StatusCode::CONFLICT, "conflict", message),
            ApiError::Invalid(message) => (StatusCode::BAD_REQUEST, "invalid_request", message),
            ApiError::Internal(message) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", message)
            }
        };
        (status, Json(ErrorBody { error, message })).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/input", get(get_input).put(replace_input))
        .route("/tasks", get(list_tasks).post(create_task))
        .route("/tasks/:id", get(get_task).delete(delete_task))
        .route("/solve", post(solve))
        .route("/schedule", get(latest_schedule))
        .route("/critical-path", get(get_critical_path))
        .with_state(state)
}

pub async fn serve(addr: SocketAddr, state: AppState) -> std::io::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn get_input(State(state): State<AppState>) -> Json<SchedulingInput> {
    let input = state.input();
    let current = input.read().input.clone();
    Json(current)
}

async fn replace_input(
    State(state): State<AppState>,
    Json(payload): Json<SchedulingInput>,
) -> Result<Json<SchedulingInput>, ApiError> {
    task_validation::validate(&payload.tasks)?;
    payload.config.validate()?;
    let input = state.input();
    *input.write().edit() = payload.clone();
    Ok(Json(payload))
}

async fn list_tasks(State(state): State<AppState>) -> Json<Vec<Task>> {
    let input = state.input();
    let tasks = input.read().input.tasks.clone();
    Json(tasks)
}

async fn get_task(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<Json<Task>, ApiError> {
    let input = state.input();
    let found = input.read().input.task(&task_id).cloned();
    found
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("task {task_id} not found")))
}

async fn create_task(
    State(state): State<AppState>,
    Json(task): Json<Task>,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    let input = state.input();
    let mut guard = input.write();
    if guard.input.task(&task.id).is_some() {
        return Err(ApiError::Conflict(format!("task {} already exists", task.id)));
    }
    let mut candidate = guard.input.tasks.clone();
    candidate.push(task.clone());
    task_validation::validate(&candidate)?;
    guard.edit().tasks = candidate;
    Ok((StatusCode::CREATED, Json(task)))
}

async fn delete_task(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let input = state.input();
    let removed = {
        let mut guard = input.write();
        let removed = guard.input.remove_task(&task_id);
        if removed.is_some() {
            guard.revision += 1;
        }
        removed
    };
    match removed {
        Some(_) => Ok(StatusCode::NO_CONTENT),
        None => Err(ApiError::not_found(format!("task {task_id} not found"))),
    }
}

/// Solves the current input. The report is always returned and stored, but
/// only a complete solve that is not older than the published one replaces
/// the schedule on the board.
async fn solve(State(state): State<AppState>) -> Result<Json<SolveResponse>, ApiError> {
    let (snapshot, input_revision) = {
        let input = state.input();
        let guard = input.read();
        (guard.input.clone(), guard.revision)
    };
    let report = tokio::task::spawn_blocking(move || planner::plan(&snapshot))
        .await
        .map_err(|err| ApiError::internal(format!("solve task failed: {err}")))??;

    if let Some(store) = &state.store {
        if let Err(err) = store.save_report(&report) {
            warn!(error = %err, "failed to store solved report");
        }
    }

    let published = if report.status.is_success() {
        let published = state.board.publish_revision(report.clone(), input_revision);
        match &published {
            Some(published) => info!(
                generation = published.generation,
                input_revision,
                status = %published.report.status,
                "schedule published"
            ),
            None => info!(input_revision, "a newer schedule is already published"),
        }
        published
    } else {
        warn!(
            status = %report.status,
            input_revision,
            "solve incomplete, keeping the published schedule"
        );
        None
    };

    Ok(Json(SolveResponse {
        published: published.is_some(),
        generation: published.map(|p| p.generation),
        input_revision,
        report,
    }))
}

async fn latest_schedule(
    State(state): State<AppState>,
) -> Result<Json<PublishedSchedule>, ApiError> {
    state
        .board
        .latest()
        .map(|published| Json(published.as_ref().clone()))
        .ok_or_else(|| ApiError::not_found("no schedule has been solved yet"))
}

async fn get_critical_path(State(state): State<AppState>) -> Result<Json<CriticalPath>, ApiError> {
    let tasks = state.input().read().input.tasks.clone();
    Ok(Json(critical_path::analyze(&tasks)?))
}
