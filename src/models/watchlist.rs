use serde::{Deserialize, Serialize};

use super::film::FilmSummary;
use crate::entities::watchlist;

pub use crate::entities::watchlist::WatchStatus;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchlistItem {
    pub id: i32,
    pub user_id: i32,
    pub film_id: i32,
    pub status: WatchStatus,
    pub personal_rating: Option<i32>,
    pub notes: Option<String>,
    pub watched_date: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<watchlist::Model> for WatchlistItem {
    fn from(model: watchlist::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            film_id: model.film_id,
            status: model.status,
            personal_rating: model.personal_rating,
            notes: model.notes,
            watched_date: model.watched_date,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// A watchlist row joined with the film it points at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchlistEntry {
    #[serde(flatten)]
    pub item: WatchlistItem,
    pub film: FilmSummary,
}

/// Sparse update of a watchlist entry. Only present fields are written.
///
/// An explicit JSON `null` reads the same as an absent field, so a stored
/// rating, note or watched date can be replaced but never cleared.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchlistPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<WatchStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub personal_rating: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub watched_date: Option<String>,
}

impl WatchlistPatch {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.personal_rating.is_none()
            && self.notes.is_none()
            && self.watched_date.is_none()
    }

    /// Applies the present fields onto an already-fetched entry.
    pub fn apply_to(&self, item: &mut WatchlistItem) {
        if let Some(status) = self.status {
            item.status = status;
        }
        if let Some(rating) = self.personal_rating {
            item.personal_rating = Some(rating);
        }
        if let Some(notes) = &self.notes {
            item.notes = Some(notes.clone());
        }
        if let Some(date) = &self.watched_date {
            item.watched_date = Some(date.clone());
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchlistStats {
    pub total_films: u64,
    pub want_to_watch: u64,
    pub watching: u64,
    pub watched: u64,
    pub rated_count: u64,
    /// Mean of personal ratings; unrated entries are excluded. `None` when nothing is rated.
    pub average_rating: Option<f64>,
}

impl WatchlistStats {
    /// Reduces a full listing into per-status counts.
    #[must_use]
    pub fn from_items<'a, I>(items: I) -> Self
    where
        I: IntoIterator<Item = &'a WatchlistItem>,
    {
        let mut stats = Self::default();
        let mut rating_sum: i64 = 0;

        for item in items {
            stats.total_films += 1;
            match item.status {
                WatchStatus::WantToWatch => stats.want_to_watch += 1,
                WatchStatus::Watching => stats.watching += 1,
                WatchStatus::Watched => stats.watched += 1,
            }
            if let Some(rating) = item.personal_rating {
                stats.rated_count += 1;
                rating_sum += i64::from(rating);
            }
        }

        if stats.rated_count > 0 {
            #[allow(clippy::cast_precision_loss)]
            let average = rating_sum as f64 / stats.rated_count as f64;
            stats.average_rating = Some((average * 100.0).round() / 100.0);
        }

        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(film_id: i32, status: WatchStatus, rating: Option<i32>) -> WatchlistItem {
        WatchlistItem {
            id: film_id,
            user_id: 1,
            film_id,
            status,
            personal_rating: rating,
            notes: None,
            watched_date: None,
            created_at: "2025-01-01T00:00:00.000000Z".to_string(),
            updated_at: "2025-01-01T00:00:00.000000Z".to_string(),
        }
    }

    #[test]
    fn test_stats_count_each_status() {
        let items = vec![
            item(1, WatchStatus::WantToWatch, None),
            item(2, WatchStatus::Watching, None),
            item(3, WatchStatus::Watched, Some(9)),
            item(4, WatchStatus::Watched, Some(6)),
        ];

        let stats = WatchlistStats::from_items(&items);
        assert_eq!(stats.total_films, 4);
        assert_eq!(stats.want_to_watch, 1);
        assert_eq!(stats.watching, 1);
        assert_eq!(stats.watched, 2);
        assert_eq!(stats.rated_count, 2);
        assert_eq!(stats.average_rating, Some(7.5));
    }

    #[test]
    fn test_unrated_entries_do_not_drag_the_average() {
        let items = vec![
            item(1, WatchStatus::Watched, Some(8)),
            item(2, WatchStatus::Watched, None),
        ];
        let stats = WatchlistStats::from_items(&items);
        assert_eq!(stats.average_rating, Some(8.0));
    }

    #[test]
    fn test_empty_listing_has_no_average() {
        let stats = WatchlistStats::from_items(&[]);
        assert_eq!(stats, WatchlistStats::default());
        assert!(stats.average_rating.is_none());
    }

    #[test]
    fn test_patch_applies_only_present_fields() {
        let mut entry = item(5, WatchStatus::WantToWatch, None);
        entry.notes = Some("keep".to_string());

        let patch = WatchlistPatch {
            status: Some(WatchStatus::Watched),
            personal_rating: Some(9),
            ..WatchlistPatch::default()
        };
        assert!(!patch.is_empty());
        patch.apply_to(&mut entry);

        assert_eq!(entry.status, WatchStatus::Watched);
        assert_eq!(entry.personal_rating, Some(9));
        assert_eq!(entry.notes.as_deref(), Some("keep"));
        assert!(WatchlistPatch::default().is_empty());
    }

    #[test]
    fn test_null_fields_leave_the_entry_untouched() {
        let patch: WatchlistPatch =
            serde_json::from_str(r#"{"notes": null, "personalRating": null}"#).unwrap();
        assert!(patch.is_empty());

        let patch: WatchlistPatch =
            serde_json::from_str(r#"{"notes": null, "status": "watching"}"#).unwrap();
        let mut entry = item(5, WatchStatus::Watched, Some(8));
        entry.notes = Some("rewatch".to_string());
        patch.apply_to(&mut entry);

        assert_eq!(entry.status, WatchStatus::Watching);
        assert_eq!(entry.personal_rating, Some(8));
        assert_eq!(entry.notes.as_deref(), Some("rewatch"));
    }

    #[test]
    fn test_entry_flattens_item_fields() {
        let entry = WatchlistEntry {
            item: item(5, WatchStatus::WantToWatch, None),
            film: FilmSummary {
                id: 5,
                title: "Heat".to_string(),
                year: Some(1995),
                genre: None,
                poster: None,
                rating: Some(8.3),
            },
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["filmId"], 5);
        assert_eq!(json["status"], "want_to_watch");
        assert_eq!(json["film"]["title"], "Heat");
    }
}
