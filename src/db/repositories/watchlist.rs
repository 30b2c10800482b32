use anyhow::{Context, Result};
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Select, Set,
};

use crate::entities::{films, watchlist};
use crate::models::{FilmSummary, WatchStatus, WatchlistEntry, WatchlistItem, WatchlistPatch};

pub struct WatchlistRepository {
    conn: DatabaseConnection,
}

impl WatchlistRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    fn for_pair(user_id: i32, film_id: i32) -> Select<watchlist::Entity> {
        watchlist::Entity::find()
            .filter(watchlist::Column::UserId.eq(user_id))
            .filter(watchlist::Column::FilmId.eq(film_id))
    }

    /// Single-statement insert-or-update on (user, film). An existing row keeps its
    /// rating, notes and creation time; only status and `updated_at` change.
    pub async fn upsert_status(
        &self,
        user_id: i32,
        film_id: i32,
        status: WatchStatus,
    ) -> Result<WatchlistItem> {
        let now = crate::db::timestamp();

        let active = watchlist::ActiveModel {
            user_id: Set(user_id),
            film_id: Set(film_id),
            status: Set(status),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        };

        watchlist::Entity::insert(active)
            .on_conflict(
                OnConflict::columns([watchlist::Column::UserId, watchlist::Column::FilmId])
                    .update_columns([watchlist::Column::Status, watchlist::Column::UpdatedAt])
                    .to_owned(),
            )
            .exec_without_returning(&self.conn)
            .await
            .context("Failed to upsert watchlist entry")?;

        self.get(user_id, film_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Watchlist entry {user_id}/{film_id} missing after upsert"))
    }

    pub async fn get(&self, user_id: i32, film_id: i32) -> Result<Option<WatchlistItem>> {
        let item = Self::for_pair(user_id, film_id)
            .one(&self.conn)
            .await
            .context("Failed to query watchlist entry")?;

        Ok(item.map(WatchlistItem::from))
    }

    /// Newest-added first, optionally restricted to one status.
    pub async fn list(
        &self,
        user_id: i32,
        status: Option<WatchStatus>,
    ) -> Result<Vec<WatchlistEntry>> {
        let mut query = watchlist::Entity::find().filter(watchlist::Column::UserId.eq(user_id));

        if let Some(status) = status {
            query = query.filter(watchlist::Column::Status.eq(status));
        }

        let rows = query
            .find_also_related(films::Entity)
            .order_by_desc(watchlist::Column::CreatedAt)
            .order_by_desc(watchlist::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list watchlist")?;

        Ok(join_rows(rows))
    }

    /// Most recently touched entries first.
    pub async fn recent(&self, user_id: i32, limit: u64) -> Result<Vec<WatchlistEntry>> {
        let rows = watchlist::Entity::find()
            .filter(watchlist::Column::UserId.eq(user_id))
            .find_also_related(films::Entity)
            .order_by_desc(watchlist::Column::UpdatedAt)
            .order_by_desc(watchlist::Column::Id)
            .limit(limit)
            .all(&self.conn)
            .await
            .context("Failed to list recent watchlist activity")?;

        Ok(join_rows(rows))
    }

    /// Applies the present fields of `patch`. Returns `None` when there is no such entry.
    pub async fn update(
        &self,
        user_id: i32,
        film_id: i32,
        patch: &WatchlistPatch,
    ) -> Result<Option<WatchlistItem>> {
        let Some(existing) = Self::for_pair(user_id, film_id)
            .one(&self.conn)
            .await
            .context("Failed to query watchlist entry for update")?
        else {
            return Ok(None);
        };

        let mut active: watchlist::ActiveModel = existing.into();
        if let Some(status) = patch.status {
            active.status = Set(status);
        }
        if let Some(rating) = patch.personal_rating {
            active.personal_rating = Set(Some(rating));
        }
        if let Some(notes) = &patch.notes {
            active.notes = Set(Some(notes.clone()));
        }
        if let Some(date) = &patch.watched_date {
            active.watched_date = Set(Some(date.clone()));
        }
        active.updated_at = Set(crate::db::timestamp());

        let model = active
            .update(&self.conn)
            .await
            .context("Failed to update watchlist entry")?;

        Ok(Some(WatchlistItem::from(model)))
    }

    pub async fn remove(&self, user_id: i32, film_id: i32) -> Result<bool> {
        let result = watchlist::Entity::delete_many()
            .filter(watchlist::Column::UserId.eq(user_id))
            .filter(watchlist::Column::FilmId.eq(film_id))
            .exec(&self.conn)
            .await
            .context("Failed to remove watchlist entry")?;

        Ok(result.rows_affected > 0)
    }
}

fn join_rows(rows: Vec<(watchlist::Model, Option<films::Model>)>) -> Vec<WatchlistEntry> {
    rows.into_iter()
        .filter_map(|(item, film)| {
            film.map(|film| WatchlistEntry {
                item: WatchlistItem::from(item),
                film: FilmSummary::from(film),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::ExternalFilm;
    use crate::db::Store;

    async fn seeded() -> (Store, i32, i32) {
        let store = Store::new("sqlite::memory:").await.unwrap();
        let user = store
            .create_user("a@b.com", "$argon2id$fake", "A", &[])
            .await
            .unwrap();
        let film = store
            .insert_film_if_absent(&ExternalFilm {
                imdb_id: Some("tt0113277".to_string()),
                title: "Heat".to_string(),
                ..ExternalFilm::default()
            })
            .await
            .unwrap();
        (store, user.id, film.id)
    }

    #[tokio::test]
    async fn test_upsert_never_duplicates_a_pair() {
        let (store, user_id, film_id) = seeded().await;
        let repo = WatchlistRepository::new(store.conn.clone());

        let first = repo
            .upsert_status(user_id, film_id, WatchStatus::WantToWatch)
            .await
            .unwrap();
        let second = repo
            .upsert_status(user_id, film_id, WatchStatus::Watching)
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.status, WatchStatus::Watching);
        assert_eq!(second.created_at, first.created_at);
        assert_eq!(repo.list(user_id, None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_upsert_keeps_rating_and_notes() {
        let (store, user_id, film_id) = seeded().await;
        let repo = WatchlistRepository::new(store.conn.clone());

        repo.upsert_status(user_id, film_id, WatchStatus::Watched)
            .await
            .unwrap();
        let patch = WatchlistPatch {
            personal_rating: Some(8),
            notes: Some("rewatch".to_string()),
            ..WatchlistPatch::default()
        };
        repo.update(user_id, film_id, &patch).await.unwrap();

        let item = repo
            .upsert_status(user_id, film_id, WatchStatus::WantToWatch)
            .await
            .unwrap();
        assert_eq!(item.personal_rating, Some(8));
        assert_eq!(item.notes.as_deref(), Some("rewatch"));
    }

    #[tokio::test]
    async fn test_list_filters_by_status_and_joins_film() {
        let (store, user_id, film_id) = seeded().await;
        let repo = WatchlistRepository::new(store.conn.clone());
        repo.upsert_status(user_id, film_id, WatchStatus::Watching)
            .await
            .unwrap();

        let watching = repo.list(user_id, Some(WatchStatus::Watching)).await.unwrap();
        assert_eq!(watching.len(), 1);
        assert_eq!(watching[0].film.title, "Heat");

        let watched = repo.list(user_id, Some(WatchStatus::Watched)).await.unwrap();
        assert!(watched.is_empty());
    }

    #[tokio::test]
    async fn test_update_and_remove_missing_entry() {
        let (store, user_id, _) = seeded().await;
        let repo = WatchlistRepository::new(store.conn.clone());

        let patch = WatchlistPatch {
            status: Some(WatchStatus::Watched),
            ..WatchlistPatch::default()
        };
        assert!(repo.update(user_id, 999, &patch).await.unwrap().is_none());
        assert!(!repo.remove(user_id, 999).await.unwrap());
    }

    #[tokio::test]
    async fn test_deleting_user_cascades_to_watchlist() {
        let (store, user_id, film_id) = seeded().await;
        let repo = WatchlistRepository::new(store.conn.clone());
        repo.upsert_status(user_id, film_id, WatchStatus::WantToWatch)
            .await
            .unwrap();

        assert!(store.delete_user(user_id).await.unwrap());
        assert!(repo.get(user_id, film_id).await.unwrap().is_none());
    }
}
