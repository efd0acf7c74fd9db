//! `/api/categories` handlers.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
};
use serde::Deserialize;

use super::{AppState, parse_status};
use crate::error::{ApiError, ApiResult, EntityKind};
use crate::types::{Category, CategoryInput, CategoryStatus, Id};

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/categories", get(list_categories).post(create_category))
        .route(
            "/categories/{id}",
            get(get_category).put(update_category).delete(delete_category),
        )
        .route("/categories/{id}/stats", put(recompute_category))
        .route("/categories/project/{project_id}", get(list_by_project))
        .route("/categories/team/{team_id}", get(list_by_team))
        .route("/categories/status/{status}", get(list_by_status))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CategoryListQuery {
    villa_id: Option<Id>,
}

async fn list_categories(
    State(state): State<AppState>,
    Query(query): Query<CategoryListQuery>,
) -> ApiResult<Json<Vec<Category>>> {
    let categories = match query.villa_id {
        Some(villa_id) => state.db().list_categories_by_villa(villa_id)?,
        None => state.db().list_categories()?,
    };
    Ok(Json(categories))
}

async fn create_category(
    State(state): State<AppState>,
    Json(input): Json<CategoryInput>,
) -> ApiResult<Json<Category>> {
    let category = state
        .db()
        .create_category(input)
        .map_err(|e| ApiError::from(e).into_bad_request())?;
    Ok(Json(category))
}

async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<Id>,
) -> ApiResult<Json<Category>> {
    state
        .db()
        .get_category(id)?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(EntityKind::Category, id))
}

async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<Id>,
    Json(input): Json<CategoryInput>,
) -> ApiResult<Json<Category>> {
    let updated = state
        .db()
        .update_category(id, input)
        .map_err(|e| ApiError::from(e).into_bad_request_unless(EntityKind::Category))?;
    Ok(Json(updated))
}

async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<Id>,
) -> ApiResult<StatusCode> {
    state.db().delete_category(id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn recompute_category(
    State(state): State<AppState>,
    Path(id): Path<Id>,
) -> ApiResult<Json<Category>> {
    Ok(Json(state.db().recompute_category_stats(id)?))
}

async fn list_by_project(
    State(state): State<AppState>,
    Path(project_id): Path<Id>,
) -> ApiResult<Json<Vec<Category>>> {
    Ok(Json(state.db().list_categories_by_project(project_id)?))
}

async fn list_by_team(
    State(state): State<AppState>,
    Path(team_id): Path<Id>,
) -> ApiResult<Json<Vec<Category>>> {
    Ok(Json(state.db().list_categories_by_team(team_id)?))
}

async fn list_by_status(
    State(state): State<AppState>,
    Path(status): Path<String>,
) -> ApiResult<Json<Vec<Category>>> {
    let status: CategoryStatus = parse_status("status", &status)?;
    Ok(Json(state.db().list_categories_by_status(status)?))
}
