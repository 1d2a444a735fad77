#![cfg(feature = "http_api")]

use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
};
use chrono::{NaiveDate, NaiveTime};
use serde_json::{Value, json};
use taskflow_scheduler::{Bucket, Resource, SchedulingInput, Task, http_api};
use tower::util::ServiceExt;

fn input() -> SchedulingInput {
    let start = NaiveDate::from_ymd_opt(2024, 1, 8)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    let mut input = SchedulingInput::new(start);
    input.buckets = vec![Bucket::new(
        "am",
        "Morning",
        NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
    )];
    input.resources = vec![Resource::new("r1", "Ito")];
    input.tasks = vec![
        Task::new("a", "Alpha", 60),
        Task::new("b", "Beta", 90).with_dependencies(["a"]),
    ];
    input
}

fn new_router() -> axum::Router {
    http_api::router(http_api::AppState::new(input()))
}

fn request(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder().method(method).uri(uri);
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_reports_ok() {
    let response = new_router()
        .oneshot(request("GET", "/health", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, json!({ "status": "ok" }));
}

#[tokio::test]
async fn task_edits_keep_dependencies_consistent() {
    let app = new_router();

    let task = json!({ "id": "c", "name": "Gamma", "duration_minutes": 30, "dependencies": ["b"] });
    let response = app
        .clone()
        .oneshot(request("POST", "/tasks", Some(task.clone())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    // Same id again
    let response = app
        .clone()
        .oneshot(request("POST", "/tasks", Some(task)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(json_body(response).await["error"], "conflict");

    let response = app
        .clone()
        .oneshot(request("GET", "/tasks/c", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let fetched: Task = serde_json::from_value(json_body(response).await).unwrap();
    assert_eq!(fetched.name, "Gamma");

    let response = app
        .clone()
        .oneshot(request("DELETE", "/tasks/b", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .clone()
        .oneshot(request("GET", "/tasks", None))
        .await
        .unwrap();
    let tasks: Vec<Task> = serde_json::from_value(json_body(response).await).unwrap();
    let ids: Vec<&str> = tasks.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "c"]);
    assert!(tasks[1].dependencies.is_empty());

    let response = app
        .oneshot(request("DELETE", "/tasks/missing", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_tasks_are_rejected() {
    let app = new_router();
    let dangling = json!({ "id": "a2", "name": "Loop", "duration_minutes": 10, "dependencies": ["ghost"] });
    let response = app
        .clone()
        .oneshot(request("POST", "/tasks", Some(dangling)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "invalid_request");

    let mut bad_input = serde_json::to_value(input()).unwrap();
    bad_input["tasks"][0]["dependencies"] = json!(["b"]);
    let response = app
        .oneshot(request("PUT", "/input", Some(bad_input)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn solve_publishes_a_schedule() {
    let app = new_router();

    let response = app
        .clone()
        .oneshot(request("GET", "/schedule", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .clone()
        .oneshot(request("POST", "/solve", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let solved = json_body(response).await;
    assert_eq!(solved["published"], true);
    assert_eq!(solved["generation"], 1);
    assert_eq!(solved["input_revision"], 0);
    assert_eq!(solved["report"]["status"], "Optimal");
    assert_eq!(solved["report"]["assignments"].as_array().unwrap().len(), 2);
    assert_eq!(solved["report"]["makespan_minutes"], 11 * 60 + 30);

    let response = app
        .clone()
        .oneshot(request("GET", "/schedule", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["generation"], 1);

    let response = app
        .oneshot(request("GET", "/critical-path", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let critical = json_body(response).await;
    assert_eq!(critical["total_minutes"], 150);
    assert_eq!(critical["path"], json!(["a", "b"]));
}

#[tokio::test]
async fn replacing_the_input_changes_the_next_solve() {
    let app = new_router();
    let mut replacement = input();
    replacement.tasks = vec![Task::new("only", "Only", 600)];

    let response = app
        .clone()
        .oneshot(request(
            "PUT",
            "/input",
            Some(serde_json::to_value(&replacement).unwrap()),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(request("GET", "/input", None))
        .await
        .unwrap();
    let current: SchedulingInput = serde_json::from_value(json_body(response).await).unwrap();
    assert_eq!(current, replacement);

    let response = app
        .oneshot(request("POST", "/solve", None))
        .await
        .unwrap();
    let solved = json_body(response).await;
    assert_eq!(solved["input_revision"], 1);
    assert_eq!(solved["published"], false);
    assert!(solved["generation"].is_null());
    assert_eq!(solved["report"]["status"], "Infeasible");
    assert_eq!(solved["report"]["violations"][0]["kind"], "unplaceable");
    assert_eq!(solved["report"]["violations"][0]["reason"], "no_enabled_bucket");
}

#[tokio::test]
async fn incomplete_solves_keep_the_published_schedule() {
    let app = new_router();
    let response = app
        .clone()
        .oneshot(request("POST", "/solve", None))
        .await
        .unwrap();
    assert_eq!(json_body(response).await["generation"], 1);

    let mut limited = input();
    limited.config.max_iterations = 1;
    let response = app
        .clone()
        .oneshot(request(
            "PUT",
            "/input",
            Some(serde_json::to_value(&limited).unwrap()),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(request("POST", "/solve", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let solved = json_body(response).await;
    assert_eq!(solved["report"]["status"], "TimedOut");
    assert_eq!(solved["published"], false);

    let response = app
        .oneshot(request("GET", "/schedule", None))
        .await
        .unwrap();
    let current = json_body(response).await;
    assert_eq!(current["generation"], 1);
    assert_eq!(current["input_revision"], 0);
    assert_eq!(current["report"]["status"], "Optimal");
}

#[tokio::test]
async fn input_edits_bump_the_revision() {
    let app = new_router();
    let task = json!({ "id": "c", "name": "Gamma", "duration_minutes": 15 });
    app.clone()
        .oneshot(request("POST", "/tasks", Some(task)))
        .await
        .unwrap();
    app.clone()
        .oneshot(request("DELETE", "/tasks/c", None))
        .await
        .unwrap();
    // Missing tasks leave the revision alone
    app.clone()
        .oneshot(request("DELETE", "/tasks/c", None))
        .await
        .unwrap();

    let response = app
        .oneshot(request("POST", "/solve", None))
        .await
        .unwrap();
    let solved = json_body(response).await;
    assert_eq!(solved["input_revision"], 2);
    assert_eq!(solved["published"], true);
}

#[tokio::test]
async fn out_of_range_config_is_rejected() {
    let mut bad = serde_json::to_value(input()).unwrap();
    bad["config"]["weights"] = json!({ "deadline": 250 });
    let response = new_router()
        .oneshot(request("PUT", "/input", Some(bad)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(
        json_body(response).await["message"]
            .as_str()
            .unwrap()
            .contains("weights.deadline")
    );
}
