//! `/api/tasks` handlers.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
};
use serde::Deserialize;

use super::{AppState, parse_status};
use crate::error::{ApiError, ApiResult, EntityKind};
use crate::types::{Id, ProgressStatus, ProjectAmounts, Task, TaskInput, TaskStatus};

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/tasks", get(list_tasks).post(create_task))
        .route("/tasks/unreceived", get(list_unreceived))
        .route("/tasks/unpaid", get(list_unpaid))
        .route(
            "/tasks/{id}",
            get(get_task).put(update_task).delete(delete_task),
        )
        .route("/tasks/{id}/progress", put(update_progress))
        .route("/tasks/{id}/receive", put(mark_received))
        .route("/tasks/{id}/pay", put(mark_paid))
        .route("/tasks/villa/{villa_id}", get(list_by_villa))
        .route("/tasks/project/{project_id}", get(list_by_project))
        .route("/tasks/project/{project_id}/amounts", get(project_amounts))
        .route("/tasks/team/{team_id}", get(list_by_team))
        .route("/tasks/status/{status}", get(list_by_status))
        .route(
            "/tasks/progress-status/{progress_status}",
            get(list_by_progress_status),
        )
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskListQuery {
    category_id: Option<Id>,
}

#[derive(Debug, Deserialize)]
struct ProgressRequest {
    progress: Option<i32>,
}

async fn list_tasks(
    State(state): State<AppState>,
    Query(query): Query<TaskListQuery>,
) -> ApiResult<Json<Vec<Task>>> {
    let tasks = match query.category_id {
        Some(category_id) => state.db().list_tasks_by_category(category_id)?,
        None => state.db().list_tasks()?,
    };
    Ok(Json(tasks))
}

async fn create_task(
    State(state): State<AppState>,
    Json(input): Json<TaskInput>,
) -> ApiResult<Json<Task>> {
    let task = state
        .db()
        .create_task(input)
        .map_err(|e| ApiError::from(e).into_bad_request())?;
    Ok(Json(task))
}

async fn get_task(State(state): State<AppState>, Path(id): Path<Id>) -> ApiResult<Json<Task>> {
    state
        .db()
        .get_task(id)?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(EntityKind::Task, id))
}

async fn update_task(
    State(state): State<AppState>,
    Path(id): Path<Id>,
    Json(input): Json<TaskInput>,
) -> ApiResult<Json<Task>> {
    let updated = state
        .db()
        .update_task(id, input)
        .map_err(|e| ApiError::from(e).into_bad_request_unless(EntityKind::Task))?;
    Ok(Json(updated))
}

async fn delete_task(State(state): State<AppState>, Path(id): Path<Id>) -> ApiResult<StatusCode> {
    state.db().delete_task(id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn update_progress(
    State(state): State<AppState>,
    Path(id): Path<Id>,
    Json(request): Json<ProgressRequest>,
) -> ApiResult<Json<Task>> {
    let progress = request
        .progress
        .ok_or_else(|| ApiError::missing_field("progress"))?;
    Ok(Json(state.db().update_task_progress(id, progress)?))
}

async fn mark_received(State(state): State<AppState>, Path(id): Path<Id>) -> ApiResult<Json<Task>> {
    Ok(Json(state.db().mark_task_received(id)?))
}

async fn mark_paid(State(state): State<AppState>, Path(id): Path<Id>) -> ApiResult<Json<Task>> {
    Ok(Json(state.db().mark_task_paid(id)?))
}

async fn list_by_villa(
    State(state): State<AppState>,
    Path(villa_id): Path<Id>,
) -> ApiResult<Json<Vec<Task>>> {
    Ok(Json(state.db().list_tasks_by_villa(villa_id)?))
}

async fn list_by_project(
    State(state): State<AppState>,
    Path(project_id): Path<Id>,
) -> ApiResult<Json<Vec<Task>>> {
    Ok(Json(state.db().list_tasks_by_project(project_id)?))
}

async fn list_by_team(
    State(state): State<AppState>,
    Path(team_id): Path<Id>,
) -> ApiResult<Json<Vec<Task>>> {
    Ok(Json(state.db().list_tasks_by_team(team_id)?))
}

async fn list_by_status(
    State(state): State<AppState>,
    Path(status): Path<String>,
) -> ApiResult<Json<Vec<Task>>> {
    let status: TaskStatus = parse_status("status", &status)?;
    Ok(Json(state.db().list_tasks_by_status(status)?))
}

async fn list_by_progress_status(
    State(state): State<AppState>,
    Path(progress_status): Path<String>,
) -> ApiResult<Json<Vec<Task>>> {
    let progress_status: ProgressStatus = parse_status("progressStatus", &progress_status)?;
    Ok(Json(state.db().list_tasks_by_progress_status(progress_status)?))
}

async fn list_unreceived(State(state): State<AppState>) -> ApiResult<Json<Vec<Task>>> {
    Ok(Json(state.db().list_unreceived_completed_tasks()?))
}

async fn list_unpaid(State(state): State<AppState>) -> ApiResult<Json<Vec<Task>>> {
    Ok(Json(state.db().list_unpaid_tasks()?))
}

async fn project_amounts(
    State(state): State<AppState>,
    Path(project_id): Path<Id>,
) -> ApiResult<Json<ProjectAmounts>> {
    Ok(Json(state.db().project_amounts(project_id)?))
}
