use axum::{
    Router,
    http::HeaderValue,
    middleware,
    routing::{get, post, put},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::clients::{FilmProviders, MetadataProvider};
use crate::config::Config;
use crate::db::Store;
use crate::services::{
    AuthService, FilmService, SeaOrmAuthService, SeaOrmFilmService, SeaOrmWatchlistService,
    TokenService, WatchlistService,
};

pub mod auth;
mod error;
mod films;
mod observability;
mod system;
mod users;
mod validation;
mod watchlist;

pub use auth::AuthUser;
pub use error::ApiError;

use metrics_exporter_prometheus::PrometheusHandle;

pub struct AppState {
    pub config: Config,

    pub store: Store,

    pub auth_service: Arc<dyn AuthService>,

    pub film_service: Arc<dyn FilmService>,

    pub watchlist_service: Arc<dyn WatchlistService>,

    pub prometheus_handle: Option<PrometheusHandle>,
}

impl AppState {
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }
}

/// Connects the database, runs migrations and wires the services.
pub async fn create_app_state(
    config: Config,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<Arc<AppState>> {
    let provider: Arc<dyn MetadataProvider> = Arc::new(FilmProviders::from_config(&config.providers));
    create_app_state_with_provider(config, provider, prometheus_handle).await
}

/// Same as [`create_app_state`] with an explicit metadata provider.
pub async fn create_app_state_with_provider(
    config: Config,
    provider: Arc<dyn MetadataProvider>,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<Arc<AppState>> {
    let store = Store::with_pool_options(
        &config.database.url,
        config.database.max_connections,
        config.database.min_connections,
    )
    .await?;

    let tokens = TokenService::from_config(&config.auth);

    let auth_service = Arc::new(SeaOrmAuthService::new(
        store.clone(),
        tokens,
        config.security.clone(),
    ));
    let film_service = Arc::new(SeaOrmFilmService::new(
        store.clone(),
        provider,
        config.catalog.clone(),
    ));
    let watchlist_service = Arc::new(SeaOrmWatchlistService::new(store.clone()));

    Ok(Arc::new(AppState {
        config,
        store,
        auth_service,
        film_service,
        watchlist_service,
        prometheus_handle,
    }))
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors_origins = state.config().server.cors_allowed_origins.clone();

    let protected_routes = create_protected_router(state.clone());

    let api_router = Router::new()
        .merge(protected_routes)
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/films/search", get(films::search_films))
        .route("/films/popular", get(films::popular_films))
        .route("/films/trending", get(films::trending_films))
        .route("/films/details/{external_id}", get(films::film_details))
        .route("/films/{id}", get(films::get_film))
        .route("/health", get(system::health))
        .route("/metrics", get(observability::get_metrics))
        .with_state(state);

    let cors_layer = if cors_origins.contains(&"*".to_string()) {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    };

    Router::new()
        .nest("/api", api_router)
        .fallback(system::not_found)
        .layer(cors_layer.allow_methods(Any).allow_headers(Any))
        .layer(middleware::from_fn(observability::security_headers_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(observability::logging_middleware))
}

fn create_protected_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/users/profile",
            get(users::get_profile).put(users::update_profile),
        )
        .route("/films/recommendations", get(films::recommendations))
        .route(
            "/watchlist",
            get(watchlist::list_watchlist).post(watchlist::add_to_watchlist),
        )
        .route("/watchlist/stats", get(watchlist::watchlist_stats))
        .route("/watchlist/recent", get(watchlist::recent_activity))
        .route(
            "/watchlist/{film_id}",
            put(watchlist::update_watchlist_item).delete(watchlist::remove_from_watchlist),
        )
        .route_layer(middleware::from_fn_with_state(state, auth::auth_middleware))
}
