//! HTTP tests driving the router in-process.

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use chantier_tracker::api::{AppState, build_router};
use chantier_tracker::db::Database;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

fn setup_app() -> Router {
    let db = Database::open_in_memory().expect("Failed to create in-memory database");
    build_router(AppState::new(Arc::new(db)), None)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

/// Create a project, a villa and a category; return their ids.
async fn seed_site(app: &Router) -> (i64, i64, i64) {
    let (status, project) = send(
        app,
        "POST",
        "/api/projects",
        Some(json!({"name": "Résidence Les Pins"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let project_id = project["id"].as_i64().unwrap();

    let (status, villa) = send(
        app,
        "POST",
        "/api/villas",
        Some(json!({"name": "Villa A", "type": "F4", "surface": 180.0, "project": {"id": project_id}})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let villa_id = villa["id"].as_i64().unwrap();

    let (status, category) = send(
        app,
        "POST",
        "/api/categories",
        Some(json!({"name": "Gros oeuvre", "villa": {"id": villa_id}})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    (project_id, villa_id, category["id"].as_i64().unwrap())
}

#[tokio::test]
async fn health_reports_version() {
    let app = setup_app();
    let (status, body) = send(&app, "GET", "/api/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn task_flow_updates_category_stats() {
    let app = setup_app();
    let (project_id, villa_id, category_id) = seed_site(&app).await;

    let (status, task) = send(
        &app,
        "POST",
        "/api/tasks",
        Some(json!({
            "name": "Fondations",
            "category": {"id": category_id},
            "villa": {"id": villa_id},
            "amount": 500.0
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(task["status"], "PENDING");
    let task_id = task["id"].as_i64().unwrap();

    let (status, task) = send(
        &app,
        "PUT",
        &format!("/api/tasks/{}/progress", task_id),
        Some(json!({"progress": 100})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(task["status"], "COMPLETED");

    let (_, category) = send(&app, "GET", &format!("/api/categories/{}", category_id), None).await;
    assert_eq!(category["tasksCount"], 1);
    assert_eq!(category["completedTasks"], 1);
    assert_eq!(category["progress"], 100);
    assert_eq!(category["status"], "ON_SCHEDULE");

    let (_, villa) = send(&app, "GET", &format!("/api/villas/{}", villa_id), None).await;
    assert_eq!(villa["status"], "COMPLETED");

    let (status, task) = send(&app, "PUT", &format!("/api/tasks/{}/pay", task_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(task["isPaid"], true);

    let (status, amounts) = send(
        &app,
        "GET",
        &format!("/api/tasks/project/{}/amounts", project_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(amounts, json!({"totalAmount": 500.0, "paidAmount": 500.0}));

    let (status, completed) = send(&app, "GET", "/api/tasks/status/completed", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(completed.as_array().unwrap().len(), 1);

    let (status, unreceived) = send(&app, "GET", "/api/tasks/unreceived", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(unreceived.as_array().unwrap().len(), 1);

    let (status, body) = send(&app, "DELETE", &format!("/api/tasks/{}", task_id), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);
}

#[tokio::test]
async fn missing_records_are_404() {
    let app = setup_app();

    let (status, body) = send(&app, "GET", "/api/tasks/41", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "TASK_NOT_FOUND");
    assert_eq!(body["message"], "Task not found with id: 41");

    let (status, body) = send(
        &app,
        "PUT",
        "/api/tasks/41/progress",
        Some(json!({"progress": 10})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "TASK_NOT_FOUND");

    let (status, _) = send(&app, "DELETE", "/api/teams/3", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&app, "PUT", "/api/categories/9/stats", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "CATEGORY_NOT_FOUND");
}

#[tokio::test]
async fn create_with_unknown_reference_is_400() {
    let app = setup_app();
    let (_, villa_id, _) = seed_site(&app).await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/tasks",
        Some(json!({"name": "Ghost", "category": {"id": 999}, "villa": {"id": villa_id}})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_REFERENCE");

    let (_, tasks) = send(&app, "GET", "/api/tasks", None).await;
    assert_eq!(tasks, json!([]));

    let (status, body) = send(&app, "POST", "/api/villas", Some(json!({"name": "Villa Z"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "MISSING_REQUIRED_FIELD");
    assert_eq!(body["field"], "project.id");
}

#[tokio::test]
async fn invalid_inputs_are_400() {
    let app = setup_app();

    let (status, body) = send(&app, "GET", "/api/tasks/status/FINISHED", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_FIELD_VALUE");
    assert_eq!(body["field"], "status");

    seed_site(&app).await;
    let (status, body) = send(&app, "PUT", "/api/tasks/1/progress", Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "progress");
}

#[tokio::test]
async fn team_endpoints() {
    let app = setup_app();

    let (status, body) = send(&app, "GET", "/api/teams/performance/average", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"averagePerformance": null}));

    let (status, team) = send(
        &app,
        "POST",
        "/api/teams",
        Some(json!({"name": "Equipe Nord", "specialty": "Plomberie", "membersCount": 5, "performance": 80})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let team_id = team["id"].as_i64().unwrap();

    let (_, found) = send(&app, "GET", "/api/teams/search?q=plomb", None).await;
    assert_eq!(found.as_array().unwrap().len(), 1);

    let (_, body) = send(&app, "GET", "/api/teams/performance/average", None).await;
    assert_eq!(body["averagePerformance"], 80.0);

    let (status, team) = send(&app, "PUT", &format!("/api/teams/{}/stats", team_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(team["performance"], 80);
    assert!(team["lastActivity"].is_i64());

    let (status, body) = send(
        &app,
        "POST",
        "/api/teams",
        Some(json!({"name": "Equipe X", "tasks": [{"id": 12}]})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_REFERENCE");
}

#[tokio::test]
async fn villa_list_filters_by_project() {
    let app = setup_app();
    let (project_id, _, _) = seed_site(&app).await;

    let (_, villas) = send(&app, "GET", &format!("/api/villas?projectId={}", project_id), None).await;
    assert_eq!(villas.as_array().unwrap().len(), 1);
    assert_eq!(villas[0]["categoriesCount"], 1);

    let (_, villas) = send(&app, "GET", "/api/villas?projectId=999", None).await;
    assert_eq!(villas, json!([]));
}

#[tokio::test]
async fn update_with_unknown_team_is_400() {
    let app = setup_app();
    let (_, villa_id, category_id) = seed_site(&app).await;
    let (_, task) = send(
        &app,
        "POST",
        "/api/tasks",
        Some(json!({"name": "Dalle", "category": {"id": category_id}, "villa": {"id": villa_id}})),
    )
    .await;
    let task_id = task["id"].as_i64().unwrap();

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/api/tasks/{}", task_id),
        Some(json!({"name": "Dalle", "team": {"id": 77}})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_REFERENCE");

    let (status, body) = send(&app, "PUT", "/api/tasks/500", Some(json!({"name": "Dalle"}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "TASK_NOT_FOUND");
}
