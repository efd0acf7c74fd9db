//! `/api/teams` handlers.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
};
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::error::{ApiError, ApiResult, EntityKind};
use crate::types::{Id, Team, TeamInput};

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/teams", get(list_teams).post(create_team))
        .route("/teams/search", get(search_teams))
        .route("/teams/active", get(list_active))
        .route("/teams/performance", get(list_by_performance))
        .route("/teams/performance/average", get(average_performance))
        .route("/teams/specialty/{specialty}", get(list_by_specialty))
        .route(
            "/teams/{id}",
            get(get_team).put(update_team).delete(delete_team),
        )
        .route("/teams/{id}/stats", put(recompute_team))
        .route("/teams/{id}/activity", put(touch_activity))
}

#[derive(Debug, Default, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    q: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AveragePerformance {
    average_performance: Option<f64>,
}

async fn list_teams(State(state): State<AppState>) -> ApiResult<Json<Vec<Team>>> {
    Ok(Json(state.db().list_teams()?))
}

async fn create_team(
    State(state): State<AppState>,
    Json(input): Json<TeamInput>,
) -> ApiResult<Json<Team>> {
    let team = state
        .db()
        .create_team(input)
        .map_err(|e| ApiError::from(e).into_bad_request())?;
    Ok(Json(team))
}

async fn get_team(State(state): State<AppState>, Path(id): Path<Id>) -> ApiResult<Json<Team>> {
    state
        .db()
        .get_team(id)?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(EntityKind::Team, id))
}

async fn update_team(
    State(state): State<AppState>,
    Path(id): Path<Id>,
    Json(input): Json<TeamInput>,
) -> ApiResult<Json<Team>> {
    Ok(Json(state.db().update_team(id, input)?))
}

async fn delete_team(State(state): State<AppState>, Path(id): Path<Id>) -> ApiResult<StatusCode> {
    state.db().delete_team(id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn search_teams(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<Vec<Team>>> {
    Ok(Json(state.db().search_teams(&query.q)?))
}

async fn list_by_specialty(
    State(state): State<AppState>,
    Path(specialty): Path<String>,
) -> ApiResult<Json<Vec<Team>>> {
    Ok(Json(state.db().list_teams_by_specialty(&specialty)?))
}

async fn list_active(State(state): State<AppState>) -> ApiResult<Json<Vec<Team>>> {
    Ok(Json(state.db().list_active_teams()?))
}

async fn list_by_performance(State(state): State<AppState>) -> ApiResult<Json<Vec<Team>>> {
    Ok(Json(state.db().list_teams_by_performance()?))
}

async fn average_performance(State(state): State<AppState>) -> ApiResult<Json<AveragePerformance>> {
    Ok(Json(AveragePerformance {
        average_performance: state.db().average_team_performance()?,
    }))
}

async fn recompute_team(State(state): State<AppState>, Path(id): Path<Id>) -> ApiResult<Json<Team>> {
    Ok(Json(state.db().recompute_team_stats(id)?))
}

async fn touch_activity(State(state): State<AppState>, Path(id): Path<Id>) -> ApiResult<Json<Team>> {
    Ok(Json(state.db().touch_team_activity(id)?))
}
