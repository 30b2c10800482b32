//! `SeaORM` implementation of the `WatchlistService` trait.

use async_trait::async_trait;
use sea_orm::SqlErr;

use crate::db::Store;
use crate::models::{WatchStatus, WatchlistEntry, WatchlistItem, WatchlistPatch, WatchlistStats};
use crate::services::watchlist_service::{WatchlistError, WatchlistService};

pub const MAX_RECENT_LIMIT: u64 = 100;

pub struct SeaOrmWatchlistService {
    store: Store,
}

impl SeaOrmWatchlistService {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }
}

/// Rejects out-of-range ratings, unparseable dates and patches that change nothing.
pub fn validate_patch(patch: &WatchlistPatch) -> Result<(), WatchlistError> {
    if patch.is_empty() {
        return Err(WatchlistError::Validation(
            "At least one of status, personalRating, notes or watchedDate is required".to_string(),
        ));
    }

    if patch
        .personal_rating
        .is_some_and(|rating| !(1..=10).contains(&rating))
    {
        return Err(WatchlistError::Validation(
            "personalRating must be between 1 and 10".to_string(),
        ));
    }

    if let Some(date) = patch.watched_date.as_deref() {
        let valid = chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d").is_ok()
            || chrono::DateTime::parse_from_rfc3339(date).is_ok();
        if !valid {
            return Err(WatchlistError::Validation(
                "watchedDate must be YYYY-MM-DD or an RFC 3339 timestamp".to_string(),
            ));
        }
    }

    Ok(())
}

#[async_trait]
impl WatchlistService for SeaOrmWatchlistService {
    async fn add_or_set_status(
        &self,
        user_id: i32,
        film_id: i32,
        status: Option<WatchStatus>,
    ) -> Result<WatchlistItem, WatchlistError> {
        let status = status.unwrap_or_default();

        match self
            .store
            .upsert_watchlist_status(user_id, film_id, status)
            .await
        {
            Ok(item) => {
                tracing::debug!(user_id, film_id, %status, "Watchlist entry upserted");
                Ok(item)
            }
            Err(e) => Err(match crate::db::constraint_violation(&e) {
                Some(SqlErr::ForeignKeyConstraintViolation(_)) => {
                    WatchlistError::UnknownFilm(film_id)
                }
                _ => WatchlistError::from(e),
            }),
        }
    }

    async fn list(
        &self,
        user_id: i32,
        status: Option<WatchStatus>,
    ) -> Result<Vec<WatchlistEntry>, WatchlistError> {
        Ok(self.store.list_watchlist(user_id, status).await?)
    }

    async fn update(
        &self,
        user_id: i32,
        film_id: i32,
        patch: WatchlistPatch,
    ) -> Result<Option<WatchlistItem>, WatchlistError> {
        validate_patch(&patch)?;
        Ok(self
            .store
            .update_watchlist_item(user_id, film_id, &patch)
            .await?)
    }

    async fn remove(&self, user_id: i32, film_id: i32) -> Result<bool, WatchlistError> {
        Ok(self.store.remove_watchlist_item(user_id, film_id).await?)
    }

    async fn stats(&self, user_id: i32) -> Result<WatchlistStats, WatchlistError> {
        let entries = self.store.list_watchlist(user_id, None).await?;
        Ok(WatchlistStats::from_items(entries.iter().map(|e| &e.item)))
    }

    async fn recent_activity(
        &self,
        user_id: i32,
        limit: u64,
    ) -> Result<Vec<WatchlistEntry>, WatchlistError> {
        if limit == 0 || limit > MAX_RECENT_LIMIT {
            return Err(WatchlistError::Validation(format!(
                "Limit must be between 1 and {MAX_RECENT_LIMIT}"
            )));
        }

        Ok(self.store.recent_watchlist_activity(user_id, limit).await?)
    }
}
