//! Domain service for identity: registration, login, bearer tokens and profiles.

use thiserror::Error;

use crate::models::PublicUser;
use crate::models::payload::{AuthResponse, RegisterRequest};
use crate::models::user::ProfileUpdate;

/// Errors specific to identity operations.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Email already registered")]
    EmailTaken,

    #[error("User not found")]
    UserNotFound,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for AuthError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        if err.downcast_ref::<sea_orm::DbErr>().is_some() {
            return Self::Database(format!("{err:#}"));
        }
        Self::Internal(format!("{err:#}"))
    }
}

/// Domain service trait for identity.
#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    /// Creates an account and signs the new user in.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Validation`] for missing fields and
    /// [`AuthError::EmailTaken`] when the email is already registered.
    async fn register(&self, request: RegisterRequest) -> Result<AuthResponse, AuthError>;

    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] for an unknown email or a wrong password alike.
    async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, AuthError>;

    /// Resolves a bearer token to the user id it was issued for.
    fn verify_token(&self, token: &str) -> Result<i32, AuthError>;

    async fn get_profile(&self, user_id: i32) -> Result<PublicUser, AuthError>;

    /// Partial update; only the provided fields change.
    async fn update_profile(
        &self,
        user_id: i32,
        update: ProfileUpdate,
    ) -> Result<PublicUser, AuthError>;
}
