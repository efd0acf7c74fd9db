//! `/api/villas` handlers.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
};
use serde::Deserialize;

use super::AppState;
use crate::error::{ApiError, ApiResult, EntityKind};
use crate::types::{Id, Villa, VillaInput};

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/villas", get(list_villas).post(create_villa))
        .route(
            "/villas/{id}",
            get(get_villa).put(update_villa).delete(delete_villa),
        )
        .route("/villas/{id}/stats", put(recompute_villa))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VillaListQuery {
    project_id: Option<Id>,
}

async fn list_villas(
    State(state): State<AppState>,
    Query(query): Query<VillaListQuery>,
) -> ApiResult<Json<Vec<Villa>>> {
    let villas = match query.project_id {
        Some(project_id) => state.db().list_villas_by_project(project_id)?,
        None => state.db().list_villas()?,
    };
    Ok(Json(villas))
}

async fn create_villa(
    State(state): State<AppState>,
    Json(input): Json<VillaInput>,
) -> ApiResult<Json<Villa>> {
    let villa = state
        .db()
        .create_villa(input)
        .map_err(|e| ApiError::from(e).into_bad_request())?;
    Ok(Json(villa))
}

async fn get_villa(State(state): State<AppState>, Path(id): Path<Id>) -> ApiResult<Json<Villa>> {
    state
        .db()
        .get_villa(id)?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(EntityKind::Villa, id))
}

async fn update_villa(
    State(state): State<AppState>,
    Path(id): Path<Id>,
    Json(input): Json<VillaInput>,
) -> ApiResult<Json<Villa>> {
    Ok(Json(state.db().update_villa(id, input)?))
}

async fn delete_villa(State(state): State<AppState>, Path(id): Path<Id>) -> ApiResult<StatusCode> {
    state.db().delete_villa(id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn recompute_villa(State(state): State<AppState>, Path(id): Path<Id>) -> ApiResult<Json<Villa>> {
    Ok(Json(state.db().recompute_villa_stats(id)?))
}
