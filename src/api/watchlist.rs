use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
};
use serde::Deserialize;
use std::sync::Arc;

use super::validation::{validate_id, validate_limit};
use super::{ApiError, AppState, AuthUser};
use crate::models::payload::{
    AddToWatchlistRequest, ItemResponse, MessageResponse, RecentActivityResponse, StatsResponse,
    WatchlistResponse,
};
use crate::models::{WatchStatus, WatchlistPatch};
use crate::services::WatchlistError;

const DEFAULT_RECENT_LIMIT: u64 = 10;

impl From<WatchlistError> for ApiError {
    fn from(err: WatchlistError) -> Self {
        match err {
            WatchlistError::Validation(msg) => Self::validation(msg),
            WatchlistError::UnknownFilm(_) => {
                Self::validation("Referenced film does not exist")
            }
            WatchlistError::Database(msg) => Self::DatabaseError(msg),
            WatchlistError::Internal(msg) => Self::internal(msg),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    pub limit: Option<u64>,
}

fn parse_status_filter(raw: Option<&str>) -> Result<Option<WatchStatus>, ApiError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => WatchStatus::parse(value).map(Some).ok_or_else(|| {
            ApiError::validation("status must be one of want_to_watch, watching, watched")
        }),
    }
}

/// GET /watchlist?status=
pub async fn list_watchlist(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    query: Result<Query<StatusQuery>, QueryRejection>,
) -> Result<Json<WatchlistResponse>, ApiError> {
    let Query(query) = query?;
    let status = parse_status_filter(query.status.as_deref())?;

    let watchlist = state.watchlist_service.list(user.id, status).await?;
    Ok(Json(WatchlistResponse { watchlist }))
}

/// POST /watchlist
pub async fn add_to_watchlist(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    payload: Result<Json<AddToWatchlistRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ItemResponse>), ApiError> {
    let Json(payload) = payload?;

    let film_id = match payload.film_id {
        Some(id) if id > 0 => id,
        Some(_) => return Err(ApiError::validation("Invalid film ID")),
        None => return Err(ApiError::validation("Film ID is required")),
    };

    let item = state
        .watchlist_service
        .add_or_set_status(user.id, film_id, payload.status)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ItemResponse {
            item,
            message: Some("Film added to watchlist".to_string()),
        }),
    ))
}

/// PUT /watchlist/{film_id}
pub async fn update_watchlist_item(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    film_id: Result<Path<String>, PathRejection>,
    payload: Result<Json<WatchlistPatch>, JsonRejection>,
) -> Result<Json<ItemResponse>, ApiError> {
    let Path(raw) = film_id?;
    let film_id = validate_id(&raw, "film")?;
    let Json(patch) = payload?;

    let item = state
        .watchlist_service
        .update(user.id, film_id, patch)
        .await?
        .ok_or_else(|| ApiError::NotFound("Watchlist item not found".to_string()))?;

    Ok(Json(ItemResponse {
        item,
        message: Some("Watchlist item updated".to_string()),
    }))
}

/// DELETE /watchlist/{film_id}
pub async fn remove_from_watchlist(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    film_id: Result<Path<String>, PathRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Path(raw) = film_id?;
    let film_id = validate_id(&raw, "film")?;

    if !state.watchlist_service.remove(user.id, film_id).await? {
        return Err(ApiError::NotFound("Watchlist item not found".to_string()));
    }

    Ok(Json(MessageResponse {
        message: "Film removed from watchlist".to_string(),
    }))
}

/// GET /watchlist/stats
pub async fn watchlist_stats(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<Json<StatsResponse>, ApiError> {
    let stats = state.watchlist_service.stats(user.id).await?;
    Ok(Json(StatsResponse { stats }))
}

/// GET /watchlist/recent?limit=
pub async fn recent_activity(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    query: Result<Query<RecentQuery>, QueryRejection>,
) -> Result<Json<RecentActivityResponse>, ApiError> {
    let Query(query) = query?;
    let limit = validate_limit(query.limit.unwrap_or(DEFAULT_RECENT_LIMIT))?;

    let recent_activity = state
        .watchlist_service
        .recent_activity(user.id, limit)
        .await?;
    Ok(Json(RecentActivityResponse { recent_activity }))
}
