//! Domain service for the film catalog.

use thiserror::Error;

use crate::clients::{ProviderError, TrendingWindow};
use crate::models::payload::SearchResponse;
use crate::models::{Film, TrendingFilm};

pub const RECOMMENDATIONS_MESSAGE: &str = "Recommendations based on popular films";

#[derive(Debug, Error)]
pub enum FilmError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<anyhow::Error> for FilmError {
    fn from(err: anyhow::Error) -> Self {
        if err.downcast_ref::<sea_orm::DbErr>().is_some() {
            return Self::Database(format!("{err:#}"));
        }
        Self::Internal(format!("{err:#}"))
    }
}

#[async_trait::async_trait]
pub trait FilmService: Send + Sync {
    /// Local search first; when nothing matches locally the provider is queried and
    /// its results are cached.
    async fn search(&self, query: &str, page: u64) -> Result<SearchResponse, FilmError>;

    async fn get_by_id(&self, id: i32) -> Result<Option<Film>, FilmError>;

    async fn get_by_external_id(&self, imdb_id: &str) -> Result<Option<Film>, FilmError>;

    /// Full record for an IMDb id. Served from the catalog once a plot is stored;
    /// falls back to whatever is cached if the provider fails.
    async fn get_details(&self, imdb_id: &str) -> Result<Option<Film>, FilmError>;

    /// Newest catalog entries first.
    async fn popular(&self, limit: u64) -> Result<Vec<Film>, FilmError>;

    /// Placeholder policy: the current popular list.
    async fn recommendations(&self, user_id: i32) -> Result<Vec<Film>, FilmError>;

    async fn trending(&self, window: TrendingWindow) -> Result<Vec<TrendingFilm>, FilmError>;
}
