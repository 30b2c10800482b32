//! `SeaORM` implementation of the `AuthService` trait.

use async_trait::async_trait;
use sea_orm::SqlErr;

use crate::config::SecurityConfig;
use crate::db::Store;
use crate::db::repositories::user::{hash_password_blocking, verify_password};
use crate::models::PublicUser;
use crate::models::payload::{AuthResponse, RegisterRequest};
use crate::models::user::ProfileUpdate;
use crate::services::auth_service::{AuthError, AuthService};
use crate::services::token::TokenService;

pub struct SeaOrmAuthService {
    store: Store,
    tokens: TokenService,
    security: SecurityConfig,
}

impl SeaOrmAuthService {
    #[must_use]
    pub const fn new(store: Store, tokens: TokenService, security: SecurityConfig) -> Self {
        Self {
            store,
            tokens,
            security,
        }
    }
}

/// Trimmed, lower-cased email; `None` if it cannot be an address.
fn normalize_email(email: &str) -> Option<String> {
    let email = email.trim().to_lowercase();
    let (local, domain) = email.split_once('@')?;
    if local.is_empty() || domain.is_empty() {
        return None;
    }
    Some(email)
}

fn clean_genres(genres: Option<Vec<String>>) -> Vec<String> {
    genres
        .unwrap_or_default()
        .into_iter()
        .map(|g| g.trim().to_string())
        .filter(|g| !g.is_empty())
        .collect()
}

#[async_trait]
impl AuthService for SeaOrmAuthService {
    async fn register(&self, request: RegisterRequest) -> Result<AuthResponse, AuthError> {
        if request.email.trim().is_empty()
            || request.password.is_empty()
            || request.name.trim().is_empty()
        {
            return Err(AuthError::Validation(
                "Email, password and name are required".to_string(),
            ));
        }

        let email = normalize_email(&request.email)
            .ok_or_else(|| AuthError::Validation("Invalid email address".to_string()))?;

        if self.store.get_user_by_email(&email).await?.is_some() {
            return Err(AuthError::EmailTaken);
        }

        let password_hash = hash_password_blocking(&request.password, &self.security).await?;
        let genres = clean_genres(request.favorite_genres);

        // A concurrent registration can still win the race; the unique index decides.
        let user = match self
            .store
            .create_user(&email, &password_hash, request.name.trim(), &genres)
            .await
        {
            Ok(user) => user,
            Err(e) => {
                return Err(match crate::db::constraint_violation(&e) {
                    Some(SqlErr::UniqueConstraintViolation(_)) => AuthError::EmailTaken,
                    _ => AuthError::from(e),
                });
            }
        };

        tracing::info!(user_id = user.id, "User registered");

        let token = self.tokens.issue(user.id)?;
        Ok(AuthResponse {
            token,
            user,
            message: None,
        })
    }

    async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, AuthError> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(AuthError::Validation(
                "Email and password are required".to_string(),
            ));
        }

        let Some(email) = normalize_email(email) else {
            return Err(AuthError::InvalidCredentials);
        };

        let Some((user, password_hash)) = self.store.get_user_with_password(&email).await? else {
            return Err(AuthError::InvalidCredentials);
        };

        if !verify_password(&password_hash, password).await? {
            return Err(AuthError::InvalidCredentials);
        }

        let token = self.tokens.issue(user.id)?;
        Ok(AuthResponse {
            token,
            user,
            message: None,
        })
    }

    fn verify_token(&self, token: &str) -> Result<i32, AuthError> {
        self.tokens.verify(token)
    }

    async fn get_profile(&self, user_id: i32) -> Result<PublicUser, AuthError> {
        self.store
            .get_user(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    async fn update_profile(
        &self,
        user_id: i32,
        update: ProfileUpdate,
    ) -> Result<PublicUser, AuthError> {
        if update.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(AuthError::Validation("Name cannot be empty".to_string()));
        }

        let update = ProfileUpdate {
            name: update.name,
            favorite_genres: update.favorite_genres.map(|g| clean_genres(Some(g))),
        };

        self.store
            .update_user_profile(user_id, &update)
            .await?
            .ok_or(AuthError::UserNotFound)
    }
}
