//! Domain service for per-user watchlists.

use thiserror::Error;

use crate::models::{WatchStatus, WatchlistEntry, WatchlistItem, WatchlistPatch, WatchlistStats};

#[derive(Debug, Error)]
pub enum WatchlistError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Film {0} does not exist")]
    UnknownFilm(i32),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<anyhow::Error> for WatchlistError {
    fn from(err: anyhow::Error) -> Self {
        if err.downcast_ref::<sea_orm::DbErr>().is_some() {
            return Self::Database(format!("{err:#}"));
        }
        Self::Internal(format!("{err:#}"))
    }
}

#[async_trait::async_trait]
pub trait WatchlistService: Send + Sync {
    /// Adds the film, or sets the status of the existing entry. Never creates a second
    /// row for the same (user, film).
    async fn add_or_set_status(
        &self,
        user_id: i32,
        film_id: i32,
        status: Option<WatchStatus>,
    ) -> Result<WatchlistItem, WatchlistError>;

    async fn list(
        &self,
        user_id: i32,
        status: Option<WatchStatus>,
    ) -> Result<Vec<WatchlistEntry>, WatchlistError>;

    /// `Ok(None)` when the user has no entry for the film.
    async fn update(
        &self,
        user_id: i32,
        film_id: i32,
        patch: WatchlistPatch,
    ) -> Result<Option<WatchlistItem>, WatchlistError>;

    /// Whether a row was actually removed.
    async fn remove(&self, user_id: i32, film_id: i32) -> Result<bool, WatchlistError>;

    async fn stats(&self, user_id: i32) -> Result<WatchlistStats, WatchlistError>;

    async fn recent_activity(
        &self,
        user_id: i32,
        limit: u64,
    ) -> Result<Vec<WatchlistEntry>, WatchlistError>;
}
