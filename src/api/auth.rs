use axum::{
    Json,
    extract::{FromRequestParts, Request, State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode, request::Parts},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use super::observability::RequestSpan;
use super::{ApiError, AppState};
use crate::models::payload::{AuthResponse, LoginRequest, RegisterRequest};
use crate::services::AuthError;

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => Self::unauthorized("Invalid credentials"),
            AuthError::InvalidToken => Self::unauthorized("Invalid or expired token"),
            AuthError::EmailTaken => Self::Conflict("User already exists with this email".into()),
            AuthError::UserNotFound => Self::NotFound("User not found".into()),
            AuthError::Validation(msg) => Self::validation(msg),
            AuthError::Database(msg) => Self::DatabaseError(msg),
            AuthError::Internal(msg) => Self::internal(msg),
        }
    }
}

/// Authenticated caller, placed in request extensions by [`auth_middleware`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub id: i32,
}

impl<S: Send + Sync> FromRequestParts<S> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Self>()
            .copied()
            .ok_or_else(|| ApiError::unauthorized("Access token required"))
    }
}

// ============================================================================
// Middleware
// ============================================================================

/// Requires `Authorization: Bearer <token>`; a missing or invalid token is a 401.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer_token(request.headers())
        .ok_or_else(|| ApiError::unauthorized("Access token required"))?;

    let user_id = state.auth_service.verify_token(&token)?;

    if let Some(span) = request.extensions().get::<RequestSpan>() {
        span.record_user(user_id);
    }
    request.extensions_mut().insert(AuthUser { id: user_id });

    Ok(next.run(request).await)
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(axum::http::header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then(|| token.to_string())
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /auth/register
pub async fn register(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let Json(payload) = payload?;

    let mut response = state.auth_service.register(payload).await?;
    response.message = Some("User created successfully".to_string());

    Ok((StatusCode::CREATED, Json(response)))
}

/// POST /auth/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>, ApiError> {
    let Json(payload) = payload?;

    let mut response = state
        .auth_service
        .login(&payload.email, &payload.password)
        .await?;
    response.message = Some("Login successful".to_string());

    Ok(Json(response))
}
