use anyhow::Result;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, SqlErr, Statement,
};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::clients::ExternalFilm;
use crate::models::user::ProfileUpdate;
use crate::models::{Film, PublicUser, WatchStatus, WatchlistEntry, WatchlistItem, WatchlistPatch};

pub mod migrator;
pub mod repositories;

pub use repositories::film::FilmPage;

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        let in_memory = db_url.contains(":memory:");
        if !in_memory {
            let path_str = db_url
                .trim_start_matches("sqlite://")
                .trim_start_matches("sqlite:");
            let path_str = path_str.split('?').next().unwrap_or(path_str);
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        // Every connection to an in-memory database sees its own empty database.
        let (max_connections, min_connections) = if in_memory {
            (1, 1)
        } else {
            (max_connections, min_connections.min(max_connections))
        };

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    /// Closes the pool shared by every clone of this store.
    pub async fn close(&self) -> Result<()> {
        self.conn.clone().close().await?;
        Ok(())
    }

    fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    fn film_repo(&self) -> repositories::film::FilmRepository {
        repositories::film::FilmRepository::new(self.conn.clone())
    }

    fn watchlist_repo(&self) -> repositories::watchlist::WatchlistRepository {
        repositories::watchlist::WatchlistRepository::new(self.conn.clone())
    }

    // Users

    pub async fn create_user(
        &self,
        email: &str,
        password_hash: &str,
        name: &str,
        favorite_genres: &[String],
    ) -> Result<PublicUser> {
        self.user_repo()
            .create(email, password_hash, name, favorite_genres)
            .await
    }

    pub async fn get_user(&self, id: i32) -> Result<Option<PublicUser>> {
        self.user_repo().get_by_id(id).await
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<PublicUser>> {
        self.user_repo().get_by_email(email).await
    }

    pub async fn get_user_with_password(
        &self,
        email: &str,
    ) -> Result<Option<(PublicUser, String)>> {
        self.user_repo().get_by_email_with_password(email).await
    }

    pub async fn update_user_profile(
        &self,
        id: i32,
        update: &ProfileUpdate,
    ) -> Result<Option<PublicUser>> {
        self.user_repo().update_profile(id, update).await
    }

    pub async fn delete_user(&self, id: i32) -> Result<bool> {
        self.user_repo().delete(id).await
    }

    // Films

    pub async fn get_film(&self, id: i32) -> Result<Option<Film>> {
        self.film_repo().get(id).await
    }

    pub async fn get_film_by_imdb_id(&self, imdb_id: &str) -> Result<Option<Film>> {
        self.film_repo().get_by_imdb_id(imdb_id).await
    }

    pub async fn search_films(&self, query: &str, page: u64, page_size: u64) -> Result<FilmPage> {
        self.film_repo().search(query, page, page_size).await
    }

    pub async fn popular_films(&self, limit: u64) -> Result<Vec<Film>> {
        self.film_repo().newest(limit).await
    }

    pub async fn insert_film_if_absent(&self, film: &ExternalFilm) -> Result<Film> {
        self.film_repo().insert_if_absent(film).await
    }

    pub async fn upsert_film_details(&self, film: &ExternalFilm) -> Result<Film> {
        self.film_repo().upsert_details(film).await
    }

    // Watchlist

    pub async fn upsert_watchlist_status(
        &self,
        user_id: i32,
        film_id: i32,
        status: WatchStatus,
    ) -> Result<WatchlistItem> {
        self.watchlist_repo()
            .upsert_status(user_id, film_id, status)
            .await
    }

    pub async fn list_watchlist(
        &self,
        user_id: i32,
        status: Option<WatchStatus>,
    ) -> Result<Vec<WatchlistEntry>> {
        self.watchlist_repo().list(user_id, status).await
    }

    pub async fn update_watchlist_item(
        &self,
        user_id: i32,
        film_id: i32,
        patch: &WatchlistPatch,
    ) -> Result<Option<WatchlistItem>> {
        self.watchlist_repo().update(user_id, film_id, patch).await
    }

    pub async fn remove_watchlist_item(&self, user_id: i32, film_id: i32) -> Result<bool> {
        self.watchlist_repo().remove(user_id, film_id).await
    }

    pub async fn recent_watchlist_activity(
        &self,
        user_id: i32,
        limit: u64,
    ) -> Result<Vec<WatchlistEntry>> {
        self.watchlist_repo().recent(user_id, limit).await
    }
}

/// Current time as a fixed-width RFC 3339 string, so lexical order matches time order.
#[must_use]
pub fn timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}

/// Storage constraint kind behind an error raised by a repository, if any.
#[must_use]
pub fn constraint_violation(err: &anyhow::Error) -> Option<SqlErr> {
    err.downcast_ref::<DbErr>().and_then(DbErr::sql_err)
}
