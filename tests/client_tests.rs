use async_trait::async_trait;
use filmlog::client::{ApiClient, CachePolicy, ClientError, FilmlogClient, QueryCache, SessionStore};
use filmlog::clients::{ExternalFilm, ExternalSearch, MetadataProvider, ProviderError, TrendingWindow};
use filmlog::config::Config;
use filmlog::models::payload::RegisterRequest;
use filmlog::models::{TrendingFilm, WatchStatus, WatchlistPatch};
use std::sync::Arc;
use std::time::Duration;

struct StubProvider;

#[async_trait]
impl MetadataProvider for StubProvider {
    async fn search(&self, query: &str, _page: u64) -> Result<ExternalSearch, ProviderError> {
        Ok(ExternalSearch {
            films: vec![ExternalFilm {
                imdb_id: Some("tt0078748".to_string()),
                title: format!("Alien ({query})"),
                year: Some(1979),
                ..ExternalFilm::default()
            }],
            total_results: 1,
        })
    }

    async fn details(&self, _imdb_id: &str) -> Result<Option<ExternalFilm>, ProviderError> {
        Ok(None)
    }

    async fn trending(&self, _window: TrendingWindow) -> Result<Vec<TrendingFilm>, ProviderError> {
        Err(ProviderError::NotConfigured("TMDB"))
    }
}

/// Serves the router on an ephemeral port and returns the `/api` base url.
async fn spawn_server() -> String {
    let mut config = Config::default();
    config.database.url = "sqlite::memory:".to_string();
    config.auth.jwt_secret = "client-secret".to_string();

    let state = filmlog::api::create_app_state_with_provider(config, Arc::new(StubProvider), None)
        .await
        .expect("Failed to create app state");
    let app = filmlog::api::router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{addr}/api")
}

fn client(base: &str) -> FilmlogClient {
    let api = ApiClient::new(base, SessionStore::new()).unwrap();
    let cache = QueryCache::new(CachePolicy {
        retry_delay: Duration::ZERO,
        ..CachePolicy::default()
    });
    FilmlogClient::with_parts(api, cache)
}

fn registration(email: &str) -> RegisterRequest {
    RegisterRequest {
        email: email.to_string(),
        password: "secret1".to_string(),
        name: "Ripley".to_string(),
        favorite_genres: Some(vec!["Sci-Fi".to_string()]),
    }
}

#[tokio::test]
async fn test_register_populates_session() {
    let base = spawn_server().await;
    let client = client(&base);

    let user = client.register(registration("ripley@nostromo.space")).await.unwrap();
    assert_eq!(user.favorite_genres, vec!["Sci-Fi".to_string()]);
    assert!(client.session().is_authenticated());

    let profile = client.profile().await.unwrap();
    assert_eq!(profile.email, "ripley@nostromo.space");

    let err = client
        .register(registration("ripley@nostromo.space"))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        ClientError::Api {
            status: 409,
            message: "User already exists with this email".to_string(),
        }
    );
}

#[tokio::test]
async fn test_unauthorized_response_clears_session() {
    let base = spawn_server().await;
    let session = SessionStore::new();
    let api = ApiClient::new(&base, session.clone()).unwrap();

    let auth = api.register(&registration("dallas@nostromo.space")).await.unwrap();
    session.login(auth.user, "not-a-real-token".to_string());
    assert!(session.is_authenticated());

    let err = api.watchlist(None).await.unwrap_err();
    assert!(err.is_unauthorized());
    assert!(!session.is_authenticated());
}

#[tokio::test]
async fn test_watchlist_flow_updates_cache_and_mirror() {
    let base = spawn_server().await;
    let client = client(&base);
    client.register(registration("kane@nostromo.space")).await.unwrap();

    let search = client.search("alien", 1).await.unwrap();
    let film_id = search.films[0].id;
    let state = client.films().snapshot();
    assert_eq!(state.search_query, "alien");
    assert!(!state.is_searching);
    assert_eq!(state.search_results.len(), 1);

    assert!(client.watchlist(None).await.unwrap().is_empty());

    let item = client.add_to_watchlist(film_id, None).await.unwrap();
    assert_eq!(item.status, WatchStatus::WantToWatch);
    assert_eq!(client.films().snapshot().watchlist.len(), 1);

    // The mutation invalidated the cached empty listing.
    let listing = client.watchlist(None).await.unwrap();
    assert_eq!(listing.len(), 1);
    assert_eq!(listing[0].film.id, film_id);

    let patch = WatchlistPatch {
        status: Some(WatchStatus::Watched),
        personal_rating: Some(8),
        ..WatchlistPatch::default()
    };
    let updated = client.update_watchlist_item(film_id, patch).await.unwrap();
    assert_eq!(updated.personal_rating, Some(8));
    assert_eq!(
        client
            .films()
            .snapshot()
            .watchlist_entry(film_id)
            .map(|e| e.item.status),
        Some(WatchStatus::Watched)
    );

    let stats = client.stats().await.unwrap();
    assert_eq!(stats.watched, 1);
    assert_eq!(stats.average_rating, Some(8.0));

    client.remove_from_watchlist(film_id).await.unwrap();
    assert!(client.films().snapshot().watchlist.is_empty());
    assert_eq!(client.stats().await.unwrap().total_films, 0);
}

#[tokio::test]
async fn test_trending_without_provider_key_is_unavailable() {
    let base = spawn_server().await;
    let client = client(&base);

    let err = client.trending(TrendingWindow::Week).await.unwrap_err();
    assert!(matches!(err, ClientError::Api { status: 503, .. }));
    assert_eq!(err.server_message(), Some("TMDB API not configured"));
}

#[tokio::test]
async fn test_logout_resets_client_state() {
    let base = spawn_server().await;
    let client = client(&base);
    client.register(registration("ash@nostromo.space")).await.unwrap();
    client.popular(None).await.unwrap();
    assert!(!client.cache().is_empty());

    client.logout();
    assert!(!client.session().is_authenticated());
    assert!(client.cache().is_empty());
    assert!(client.recommendations().await.unwrap_err().is_unauthorized());
}
