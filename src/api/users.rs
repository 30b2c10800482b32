use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use std::sync::Arc;

use super::{ApiError, AppState, AuthUser};
use crate::models::payload::UserResponse;
use crate::models::user::ProfileUpdate;

/// GET /users/profile
pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state.auth_service.get_profile(user.id).await?;
    Ok(Json(UserResponse {
        user,
        message: None,
    }))
}

/// PUT /users/profile
/// Only `name` and `favoriteGenres` present in the body are changed.
pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    payload: Result<Json<ProfileUpdate>, JsonRejection>,
) -> Result<Json<UserResponse>, ApiError> {
    let Json(update) = payload?;

    let user = state.auth_service.update_profile(user.id, update).await?;
    Ok(Json(UserResponse {
        user,
        message: Some("Profile updated successfully".to_string()),
    }))
}
