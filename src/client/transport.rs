use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

use super::{ClientError, SessionStore};
use crate::clients::TrendingWindow;
use crate::models::payload::{
    AddToWatchlistRequest, AuthResponse, ErrorBody, FilmResponse, FilmsResponse, HealthResponse,
    ItemResponse, LoginRequest, MessageResponse, RecentActivityResponse, RecommendationsResponse,
    RegisterRequest, SearchResponse, StatsResponse, TrendingResponse, UserResponse,
    WatchlistResponse,
};
use crate::models::user::ProfileUpdate;
use crate::models::{WatchStatus, WatchlistPatch};

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP transport for the `/api` surface.
///
/// Every call runs decorate (attach bearer token) then send then handle.
/// A 401 from any endpoint clears the shared [`SessionStore`].
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    session: SessionStore,
}

impl ApiClient {
    /// `base_url` is the server root, e.g. `http://localhost:3000/api`.
    pub fn new(base_url: impl Into<String>, session: SessionStore) -> Result<Self, ClientError> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ClientError::Network(e.to_string()))?;

        Ok(Self::with_http(http, base_url, session))
    }

    #[must_use]
    pub fn with_http(http: Client, base_url: impl Into<String>, session: SessionStore) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http,
            base_url,
            session,
        }
    }

    #[must_use]
    pub const fn session(&self) -> &SessionStore {
        &self.session
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn decorate(&self, request: RequestBuilder) -> RequestBuilder {
        match self.session.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn handle<T: DeserializeOwned>(&self, response: Response) -> Result<T, ClientError> {
        let status = response.status();

        if status.is_success() {
            return response.json::<T>().await.map_err(ClientError::from);
        }

        let message = match response.json::<ErrorBody>().await {
            Ok(body) => body.error,
            Err(_) => status
                .canonical_reason()
                .unwrap_or("Request failed")
                .to_string(),
        };

        if status == StatusCode::UNAUTHORIZED {
            if self.session.is_authenticated() {
                warn!("Server rejected the session token, logging out");
            }
            self.session.logout();
            return Err(ClientError::Unauthorized(message));
        }

        Err(ClientError::Api {
            status: status.as_u16(),
            message,
        })
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ClientError> {
        let response = self.decorate(request).send().await?;
        debug!(status = response.status().as_u16(), url = %response.url(), "API response");
        self.handle(response).await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        self.send(self.http.get(self.url(path))).await
    }

    pub async fn health(&self) -> Result<HealthResponse, ClientError> {
        self.get("/health").await
    }

    pub async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, ClientError> {
        self.send(self.http.post(self.url("/auth/register")).json(request))
            .await
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, ClientError> {
        let body = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        self.send(self.http.post(self.url("/auth/login")).json(&body))
            .await
    }

    pub async fn profile(&self) -> Result<UserResponse, ClientError> {
        self.get("/users/profile").await
    }

    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<UserResponse, ClientError> {
        self.send(self.http.put(self.url("/users/profile")).json(update))
            .await
    }

    pub async fn search_films(&self, query: &str, page: u64) -> Result<SearchResponse, ClientError> {
        let path = format!(
            "/films/search?q={}&page={page}",
            urlencoding::encode(query)
        );
        self.get(&path).await
    }

    pub async fn popular_films(&self, limit: Option<u64>) -> Result<FilmsResponse, ClientError> {
        match limit {
            Some(limit) => self.get(&format!("/films/popular?limit={limit}")).await,
            None => self.get("/films/popular").await,
        }
    }

    pub async fn trending_films(
        &self,
        window: TrendingWindow,
    ) -> Result<TrendingResponse, ClientError> {
        self.get(&format!("/films/trending?timeWindow={}", window.as_str()))
            .await
    }

    pub async fn film(&self, id: i32) -> Result<FilmResponse, ClientError> {
        self.get(&format!("/films/{id}")).await
    }

    pub async fn film_details(&self, imdb_id: &str) -> Result<FilmResponse, ClientError> {
        self.get(&format!("/films/details/{}", urlencoding::encode(imdb_id)))
            .await
    }

    pub async fn recommendations(&self) -> Result<RecommendationsResponse, ClientError> {
        self.get("/films/recommendations").await
    }

    pub async fn watchlist(
        &self,
        status: Option<WatchStatus>,
    ) -> Result<WatchlistResponse, ClientError> {
        match status {
            Some(status) => self.get(&format!("/watchlist?status={status}")).await,
            None => self.get("/watchlist").await,
        }
    }

    pub async fn add_to_watchlist(
        &self,
        film_id: i32,
        status: Option<WatchStatus>,
    ) -> Result<ItemResponse, ClientError> {
        let body = AddToWatchlistRequest {
            film_id: Some(film_id),
            status,
        };
        self.send(self.http.post(self.url("/watchlist")).json(&body))
            .await
    }

    pub async fn update_watchlist_item(
        &self,
        film_id: i32,
        patch: &WatchlistPatch,
    ) -> Result<ItemResponse, ClientError> {
        self.send(
            self.http
                .put(self.url(&format!("/watchlist/{film_id}")))
                .json(patch),
        )
        .await
    }

    pub async fn remove_from_watchlist(&self, film_id: i32) -> Result<MessageResponse, ClientError> {
        self.send(self.http.delete(self.url(&format!("/watchlist/{film_id}"))))
            .await
    }

    pub async fn watchlist_stats(&self) -> Result<StatsResponse, ClientError> {
        self.get("/watchlist/stats").await
    }

    pub async fn recent_activity(
        &self,
        limit: Option<u64>,
    ) -> Result<RecentActivityResponse, ClientError> {
        match limit {
            Some(limit) => self.get(&format!("/watchlist/recent?limit={limit}")).await,
            None => self.get("/watchlist/recent").await,
        }
    }
}
