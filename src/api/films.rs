use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{PathRejection, QueryRejection},
    },
};
use serde::Deserialize;
use std::sync::Arc;

use super::validation::{validate_external_id, validate_id, validate_limit, validate_search_query};
use super::{ApiError, AppState, AuthUser};
use crate::clients::{ProviderError, TrendingWindow};
use crate::models::payload::{
    FilmResponse, FilmsResponse, RecommendationsResponse, SearchResponse, TrendingResponse,
};
use crate::services::FilmError;
use crate::services::film_service::RECOMMENDATIONS_MESSAGE;

impl From<FilmError> for ApiError {
    fn from(err: FilmError) -> Self {
        match err {
            FilmError::Validation(msg) => Self::validation(msg),
            FilmError::Provider(ProviderError::NotConfigured(service)) => {
                Self::ServiceUnavailable(format!("{service} API not configured"))
            }
            FilmError::Provider(ProviderError::Upstream { service, message }) => {
                Self::ExternalApiError {
                    service: service.to_string(),
                    message,
                }
            }
            FilmError::Database(msg) => Self::DatabaseError(msg),
            FilmError::Internal(msg) => Self::internal(msg),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
    pub page: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendingQuery {
    pub time_window: Option<String>,
}

/// GET /films/search?q=&page=
pub async fn search_films(
    State(state): State<Arc<AppState>>,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> Result<Json<SearchResponse>, ApiError> {
    let Query(query) = query?;
    let q = validate_search_query(&query.q)?;
    let page = u64::try_from(query.page.unwrap_or(1)).unwrap_or(1).max(1);

    let result = state.film_service.search(q, page).await?;
    Ok(Json(result))
}

/// GET /films/popular?limit=
pub async fn popular_films(
    State(state): State<Arc<AppState>>,
    query: Result<Query<LimitQuery>, QueryRejection>,
) -> Result<Json<FilmsResponse>, ApiError> {
    let Query(query) = query?;
    let limit = validate_limit(
        query
            .limit
            .unwrap_or(state.config().catalog.popular_default_limit),
    )?;

    let films = state.film_service.popular(limit).await?;
    Ok(Json(FilmsResponse { films }))
}

/// GET /films/trending?timeWindow=day|week
pub async fn trending_films(
    State(state): State<Arc<AppState>>,
    query: Result<Query<TrendingQuery>, QueryRejection>,
) -> Result<Json<TrendingResponse>, ApiError> {
    let Query(query) = query?;
    let window = match query.time_window.as_deref() {
        None | Some("") => TrendingWindow::default(),
        Some(raw) => TrendingWindow::parse(raw)
            .ok_or_else(|| ApiError::validation("timeWindow must be 'day' or 'week'"))?,
    };

    let films = state.film_service.trending(window).await?;
    Ok(Json(TrendingResponse { films }))
}

/// GET /films/{id}
pub async fn get_film(
    State(state): State<Arc<AppState>>,
    id: Result<Path<String>, PathRejection>,
) -> Result<Json<FilmResponse>, ApiError> {
    let Path(raw) = id?;
    let id = validate_id(&raw, "film")?;

    let film = state
        .film_service
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Film not found".to_string()))?;

    Ok(Json(FilmResponse { film }))
}

/// GET /films/details/{external_id}
pub async fn film_details(
    State(state): State<Arc<AppState>>,
    external_id: Result<Path<String>, PathRejection>,
) -> Result<Json<FilmResponse>, ApiError> {
    let Path(raw) = external_id?;
    let imdb_id = validate_external_id(&raw)?;

    let film = state
        .film_service
        .get_details(imdb_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Film not found".to_string()))?;

    Ok(Json(FilmResponse { film }))
}

/// GET /films/recommendations
pub async fn recommendations(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<Json<RecommendationsResponse>, ApiError> {
    let films = state.film_service.recommendations(user.id).await?;
    Ok(Json(RecommendationsResponse {
        films,
        message: RECOMMENDATIONS_MESSAGE.to_string(),
    }))
}
