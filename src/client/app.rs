use std::future::Future;
use tracing::debug;

use super::{ApiClient, CachePolicy, ClientError, FilmStore, QueryCache, QueryKey, SessionStore};
use crate::clients::TrendingWindow;
use crate::models::payload::{AuthResponse, RegisterRequest, SearchResponse};
use crate::models::user::ProfileUpdate;
use crate::models::{
    Film, PublicUser, TrendingFilm, WatchStatus, WatchlistEntry, WatchlistItem, WatchlistPatch,
    WatchlistStats,
};

const DEFAULT_POPULAR_LIMIT: u64 = 20;
const DEFAULT_RECENT_LIMIT: u64 = 10;

/// Session, transport, cache and view state behind one handle.
///
/// Reads go through the [`QueryCache`]; mutations invalidate the current
/// user's watchlist keys once the server has answered and mirror the result
/// into the [`FilmStore`].
#[derive(Debug, Clone)]
pub struct FilmlogClient {
    api: ApiClient,
    cache: QueryCache,
    films: FilmStore,
}

impl FilmlogClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let api = ApiClient::new(base_url, SessionStore::new())?;
        Ok(Self::with_parts(api, QueryCache::new(CachePolicy::default())))
    }

    #[must_use]
    pub fn with_parts(api: ApiClient, cache: QueryCache) -> Self {
        Self {
            api,
            cache,
            films: FilmStore::new(),
        }
    }

    #[must_use]
    pub const fn api(&self) -> &ApiClient {
        &self.api
    }

    #[must_use]
    pub const fn session(&self) -> &SessionStore {
        self.api.session()
    }

    #[must_use]
    pub const fn cache(&self) -> &QueryCache {
        &self.cache
    }

    #[must_use]
    pub const fn films(&self) -> &FilmStore {
        &self.films
    }

    fn user_id(&self) -> Result<i32, ClientError> {
        self.session()
            .current_user()
            .map(|user| user.id)
            .ok_or_else(|| ClientError::Unauthorized("Not logged in".to_string()))
    }

    /// A 401 has already cleared the session; drop everything cached for it.
    fn observe<T>(&self, result: Result<T, ClientError>) -> Result<T, ClientError> {
        if let Err(err) = &result
            && err.is_unauthorized()
        {
            self.cache.clear();
            self.films.reset();
        }
        result
    }

    async fn run_mutation<T, F, Fut>(&self, operation: F) -> Result<T, ClientError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, ClientError>>,
    {
        let result = self.cache.mutate(operation).await;
        self.observe(result)
    }

    fn start_session(&self, auth: AuthResponse) -> PublicUser {
        self.cache.clear();
        self.films.reset();
        self.session().login(auth.user.clone(), auth.token);
        auth.user
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<PublicUser, ClientError> {
        let auth = self
            .run_mutation(|| self.api.login(email, password))
            .await?;
        Ok(self.start_session(auth))
    }

    pub async fn register(&self, request: RegisterRequest) -> Result<PublicUser, ClientError> {
        let auth = self
            .run_mutation(|| self.api.register(&request))
            .await?;
        Ok(self.start_session(auth))
    }

    pub fn logout(&self) {
        self.session().logout();
        self.cache.clear();
        self.films.reset();
    }

    /// Marks every cached query stale after connectivity returns.
    pub fn on_reconnect(&self) -> usize {
        debug!("Connection restored, marking queries stale");
        self.cache.on_reconnect()
    }

    pub async fn profile(&self) -> Result<PublicUser, ClientError> {
        let user_id = self.user_id()?;
        let api = self.api.clone();
        let result = self
            .cache
            .fetch(QueryKey::user(user_id), move || {
                let api = api.clone();
                async move { api.profile().await.map(|r| r.user) }
            })
            .await;
        self.observe(result)
    }

    pub async fn update_profile(&self, update: ProfileUpdate) -> Result<PublicUser, ClientError> {
        let user_id = self.user_id()?;
        let response = self
            .run_mutation(|| self.api.update_profile(&update))
            .await?;

        self.cache.invalidate(&QueryKey::user(user_id));
        self.session().set_user(response.user.clone());
        Ok(response.user)
    }

    pub async fn search(&self, query: &str, page: u64) -> Result<SearchResponse, ClientError> {
        let query = query.trim().to_string();
        self.films.set_search_query(query.clone());
        self.films.set_searching(true);

        let api = self.api.clone();
        let key = QueryKey::search(&query, page);
        let result = self
            .cache
            .fetch(key, move || {
                let api = api.clone();
                let query = query.clone();
                async move { api.search_films(&query, page).await }
            })
            .await;

        self.films.set_searching(false);
        let response = self.observe(result)?;
        self.films.set_search_results(response.films.clone());
        Ok(response)
    }

    pub async fn popular(&self, limit: Option<u64>) -> Result<Vec<Film>, ClientError> {
        let limit = limit.unwrap_or(DEFAULT_POPULAR_LIMIT);
        let api = self.api.clone();
        let result = self
            .cache
            .fetch(QueryKey::popular(limit), move || {
                let api = api.clone();
                async move { api.popular_films(Some(limit)).await.map(|r| r.films) }
            })
            .await;
        self.observe(result)
    }

    pub async fn trending(&self, window: TrendingWindow) -> Result<Vec<TrendingFilm>, ClientError> {
        let api = self.api.clone();
        let result = self
            .cache
            .fetch(QueryKey::trending(window.as_str()), move || {
                let api = api.clone();
                async move { api.trending_films(window).await.map(|r| r.films) }
            })
            .await;
        self.observe(result)
    }

    pub async fn film(&self, id: i32) -> Result<Film, ClientError> {
        let api = self.api.clone();
        let result = self
            .cache
            .fetch(QueryKey::film(id), move || {
                let api = api.clone();
                async move { api.film(id).await.map(|r| r.film) }
            })
            .await;
        let film = self.observe(result)?;
        self.films.set_current_film(Some(film.clone()));
        Ok(film)
    }

    pub async fn film_details(&self, imdb_id: &str) -> Result<Film, ClientError> {
        let api = self.api.clone();
        let imdb_id = imdb_id.to_string();
        let key = QueryKey::film_details(&imdb_id);
        let result = self
            .cache
            .fetch(key, move || {
                let api = api.clone();
                let imdb_id = imdb_id.clone();
                async move { api.film_details(&imdb_id).await.map(|r| r.film) }
            })
            .await;
        let film = self.observe(result)?;
        self.films.set_current_film(Some(film.clone()));
        Ok(film)
    }

    pub async fn recommendations(&self) -> Result<Vec<Film>, ClientError> {
        let user_id = self.user_id()?;
        let api = self.api.clone();
        let result = self
            .cache
            .fetch(QueryKey::recommendations(user_id), move || {
                let api = api.clone();
                async move { api.recommendations().await.map(|r| r.films) }
            })
            .await;
        let films = self.observe(result)?;
        self.films.set_recommendations(films.clone());
        Ok(films)
    }

    /// The unfiltered listing also refreshes the local mirror.
    pub async fn watchlist(
        &self,
        status: Option<WatchStatus>,
    ) -> Result<Vec<WatchlistEntry>, ClientError> {
        let user_id = self.user_id()?;
        let api = self.api.clone();
        let key = QueryKey::watchlist_list(user_id, status.map(WatchStatus::as_str));
        let result = self
            .cache
            .fetch(key, move || {
                let api = api.clone();
                async move { api.watchlist(status).await.map(|r| r.watchlist) }
            })
            .await;
        let entries = self.observe(result)?;
        if status.is_none() {
            self.films.set_watchlist(entries.clone());
        }
        Ok(entries)
    }

    pub async fn add_to_watchlist(
        &self,
        film_id: i32,
        status: Option<WatchStatus>,
    ) -> Result<WatchlistItem, ClientError> {
        let user_id = self.user_id()?;
        let response = self
            .run_mutation(|| self.api.add_to_watchlist(film_id, status))
            .await?;
        self.cache.invalidate(&QueryKey::watchlist(user_id));

        let item = response.item;
        if !self.films.apply_item(item.clone()) {
            let film = self.films.snapshot().film_summary(film_id);
            match film {
                Some(film) => self.films.add_to_watchlist(WatchlistEntry {
                    item: item.clone(),
                    film,
                }),
                None => {
                    self.watchlist(None).await?;
                }
            }
        }
        Ok(item)
    }

    pub async fn update_watchlist_item(
        &self,
        film_id: i32,
        patch: WatchlistPatch,
    ) -> Result<WatchlistItem, ClientError> {
        let user_id = self.user_id()?;
        let response = self
            .run_mutation(|| self.api.update_watchlist_item(film_id, &patch))
            .await?;
        self.cache.invalidate(&QueryKey::watchlist(user_id));
        self.films.apply_item(response.item.clone());
        Ok(response.item)
    }

    pub async fn remove_from_watchlist(&self, film_id: i32) -> Result<(), ClientError> {
        let user_id = self.user_id()?;
        self.run_mutation(|| self.api.remove_from_watchlist(film_id))
            .await?;
        self.cache.invalidate(&QueryKey::watchlist(user_id));
        self.films.remove_from_watchlist(film_id);
        Ok(())
    }

    pub async fn stats(&self) -> Result<WatchlistStats, ClientError> {
        let user_id = self.user_id()?;
        let api = self.api.clone();
        let result = self
            .cache
            .fetch(QueryKey::watchlist_stats(user_id), move || {
                let api = api.clone();
                async move { api.watchlist_stats().await.map(|r| r.stats) }
            })
            .await;
        self.observe(result)
    }

    pub async fn recent_activity(
        &self,
        limit: Option<u64>,
    ) -> Result<Vec<WatchlistEntry>, ClientError> {
        let user_id = self.user_id()?;
        let limit = limit.unwrap_or(DEFAULT_RECENT_LIMIT);
        let api = self.api.clone();
        let result = self
            .cache
            .fetch(QueryKey::watchlist_recent(user_id, limit), move || {
                let api = api.clone();
                async move { api.recent_activity(Some(limit)).await.map(|r| r.recent_activity) }
            })
            .await;
        self.observe(result)
    }
}
