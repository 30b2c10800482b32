use axum::{Json, extract::State};
use std::sync::Arc;

use super::{ApiError, AppState};
use crate::models::payload::HealthResponse;

/// GET /health
///
/// Reports 503 when the database does not answer.
pub async fn health(
    State(state): State<Arc<AppState>>,
) -> Result<Json<HealthResponse>, ApiError> {
    if let Err(e) = state.store.ping().await {
        tracing::warn!(error = %e, "Health check failed to reach the database");
        return Err(ApiError::ServiceUnavailable("Database unavailable".to_string()));
    }

    Ok(Json(HealthResponse {
        status: "OK".to_string(),
        message: "Filmlog API is running".to_string(),
    }))
}

pub async fn not_found() -> ApiError {
    ApiError::NotFound("Route not found".to_string())
}
