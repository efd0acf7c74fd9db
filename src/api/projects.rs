//! `/api/projects` handlers.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};

use super::AppState;
use crate::error::{ApiError, ApiResult, EntityKind};
use crate::types::{Id, Project, ProjectInput};

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/projects", get(list_projects).post(create_project))
        .route(
            "/projects/{id}",
            get(get_project).put(update_project).delete(delete_project),
        )
}

async fn list_projects(State(state): State<AppState>) -> ApiResult<Json<Vec<Project>>> {
    Ok(Json(state.db().list_projects()?))
}

async fn create_project(
    State(state): State<AppState>,
    Json(input): Json<ProjectInput>,
) -> ApiResult<Json<Project>> {
    Ok(Json(state.db().create_project(input)?))
}

async fn get_project(State(state): State<AppState>, Path(id): Path<Id>) -> ApiResult<Json<Project>> {
    state
        .db()
        .get_project(id)?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(EntityKind::Project, id))
}

async fn update_project(
    State(state): State<AppState>,
    Path(id): Path<Id>,
    Json(input): Json<ProjectInput>,
) -> ApiResult<Json<Project>> {
    Ok(Json(state.db().update_project(id, input)?))
}

async fn delete_project(State(state): State<AppState>, Path(id): Path<Id>) -> ApiResult<StatusCode> {
    state.db().delete_project(id)?;
    Ok(StatusCode::NO_CONTENT)
}
