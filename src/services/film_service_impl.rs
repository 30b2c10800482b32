//! `SeaORM` implementation of the `FilmService` trait.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::clients::{ExternalFilm, MetadataProvider, ProviderError, TrendingWindow};
use crate::config::CatalogConfig;
use crate::db::Store;
use crate::models::payload::SearchResponse;
use crate::models::{Film, TrendingFilm};
use crate::services::film_service::{FilmError, FilmService};

pub const MAX_LIST_LIMIT: u64 = 100;

pub struct SeaOrmFilmService {
    store: Store,
    provider: Arc<dyn MetadataProvider>,
    catalog: CatalogConfig,
}

impl SeaOrmFilmService {
    #[must_use]
    pub fn new(store: Store, provider: Arc<dyn MetadataProvider>, catalog: CatalogConfig) -> Self {
        Self {
            store,
            provider,
            catalog,
        }
    }

    /// Persists provider results; the stored row wins over a duplicate.
    async fn cache_films(&self, films: &[ExternalFilm]) -> Vec<Film> {
        let mut saved = Vec::with_capacity(films.len());

        for film in films {
            match self.store.insert_film_if_absent(film).await {
                Ok(film) => saved.push(film),
                Err(e) => warn!(
                    imdb_id = film.imdb_id.as_deref().unwrap_or("-"),
                    error = %e,
                    "Failed to cache film"
                ),
            }
        }

        saved
    }
}

#[async_trait]
impl FilmService for SeaOrmFilmService {
    async fn search(&self, query: &str, page: u64) -> Result<SearchResponse, FilmError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(FilmError::Validation(
                "Search query is required".to_string(),
            ));
        }
        let page = page.max(1);

        let local = self
            .store
            .search_films(query, page, self.catalog.search_page_size)
            .await?;

        if local.total > 0 {
            return Ok(SearchResponse {
                films: local.films,
                total_results: local.total,
                page,
            });
        }

        debug!(query, page, "No local matches, querying provider");
        let external = self.provider.search(query, page).await?;
        let films = self.cache_films(&external.films).await;

        Ok(SearchResponse {
            total_results: external.total_results.max(films.len() as u64),
            films,
            page,
        })
    }

    async fn get_by_id(&self, id: i32) -> Result<Option<Film>, FilmError> {
        Ok(self.store.get_film(id).await?)
    }

    async fn get_by_external_id(&self, imdb_id: &str) -> Result<Option<Film>, FilmError> {
        Ok(self.store.get_film_by_imdb_id(imdb_id).await?)
    }

    async fn get_details(&self, imdb_id: &str) -> Result<Option<Film>, FilmError> {
        let imdb_id = imdb_id.trim();
        if imdb_id.is_empty() {
            return Err(FilmError::Validation("External id is required".to_string()));
        }

        let cached = self.get_by_external_id(imdb_id).await?;
        if cached.as_ref().is_some_and(Film::has_details) {
            return Ok(cached);
        }

        match self.provider.details(imdb_id).await {
            Ok(Some(detail)) => match self.store.upsert_film_details(&detail).await {
                Ok(film) => Ok(Some(film)),
                Err(e) => {
                    warn!(imdb_id, error = %e, "Failed to store film details");
                    Ok(cached)
                }
            },
            Ok(None) | Err(ProviderError::NotConfigured(_)) => Ok(cached),
            Err(e) if cached.is_none() => Err(e.into()),
            Err(e) => {
                warn!(imdb_id, error = %e, "Detail fetch failed, serving cached record");
                Ok(cached)
            }
        }
    }

    async fn popular(&self, limit: u64) -> Result<Vec<Film>, FilmError> {
        if limit == 0 || limit > MAX_LIST_LIMIT {
            return Err(FilmError::Validation(format!(
                "Limit must be between 1 and {MAX_LIST_LIMIT}"
            )));
        }

        Ok(self.store.popular_films(limit).await?)
    }

    async fn recommendations(&self, user_id: i32) -> Result<Vec<Film>, FilmError> {
        debug!(user_id, "Serving popular films as recommendations");
        self.popular(self.catalog.recommendation_limit.clamp(1, MAX_LIST_LIMIT))
            .await
    }

    async fn trending(&self, window: TrendingWindow) -> Result<Vec<TrendingFilm>, FilmError> {
        Ok(self.provider.trending(window).await?)
    }
}
