use std::sync::Arc;
use tokio::sync::watch;

use crate::models::{Film, FilmSummary, WatchlistEntry, WatchlistItem, WatchlistPatch};

/// Last search results and a local mirror of the watchlist, for the UI to render.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilmState {
    pub search_results: Vec<Film>,
    pub search_query: String,
    pub is_searching: bool,
    /// At most one entry per film.
    pub watchlist: Vec<WatchlistEntry>,
    pub recommendations: Vec<Film>,
    pub current_film: Option<Film>,
}

impl FilmState {
    #[must_use]
    pub fn watchlist_entry(&self, film_id: i32) -> Option<&WatchlistEntry> {
        self.watchlist.iter().find(|e| e.item.film_id == film_id)
    }

    /// Summary of a film known to the view state from any source.
    #[must_use]
    pub fn film_summary(&self, film_id: i32) -> Option<FilmSummary> {
        self.current_film
            .iter()
            .chain(&self.search_results)
            .chain(&self.recommendations)
            .find(|film| film.id == film_id)
            .map(FilmSummary::from)
    }
}

#[derive(Debug, Clone)]
pub struct FilmStore {
    tx: Arc<watch::Sender<FilmState>>,
}

impl Default for FilmStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FilmStore {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = watch::channel(FilmState::default());
        Self { tx: Arc::new(tx) }
    }

    #[must_use]
    pub fn snapshot(&self) -> FilmState {
        self.tx.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<FilmState> {
        self.tx.subscribe()
    }

    pub fn set_search_results(&self, films: Vec<Film>) {
        self.tx.send_modify(|state| state.search_results = films);
    }

    pub fn set_watchlist(&self, watchlist: Vec<WatchlistEntry>) {
        self.tx.send_modify(|state| state.watchlist = watchlist);
    }

    /// Replaces the entry for the same film, or appends.
    pub fn add_to_watchlist(&self, entry: WatchlistEntry) {
        self.tx.send_modify(|state| {
            match state
                .watchlist
                .iter_mut()
                .find(|e| e.item.film_id == entry.item.film_id)
            {
                Some(existing) => *existing = entry,
                None => state.watchlist.push(entry),
            }
        });
    }

    /// Refreshes the mirrored row for `item.film_id`. Returns `false` when
    /// the film is not mirrored yet.
    pub fn apply_item(&self, item: WatchlistItem) -> bool {
        self.tx.send_if_modified(|state| {
            state
                .watchlist
                .iter_mut()
                .find(|e| e.item.film_id == item.film_id)
                .map(|existing| existing.item = item)
                .is_some()
        })
    }

    pub fn remove_from_watchlist(&self, film_id: i32) {
        self.tx.send_if_modified(|state| {
            let before = state.watchlist.len();
            state.watchlist.retain(|e| e.item.film_id != film_id);
            state.watchlist.len() != before
        });
    }

    pub fn update_watchlist_entry(&self, film_id: i32, patch: &WatchlistPatch) {
        self.tx.send_if_modified(|state| {
            state
                .watchlist
                .iter_mut()
                .find(|e| e.item.film_id == film_id)
                .map(|entry| patch.apply_to(&mut entry.item))
                .is_some()
        });
    }

    pub fn set_recommendations(&self, films: Vec<Film>) {
        self.tx.send_modify(|state| state.recommendations = films);
    }

    pub fn set_current_film(&self, film: Option<Film>) {
        self.tx.send_modify(|state| state.current_film = film);
    }

    pub fn set_search_query(&self, query: impl Into<String>) {
        let query = query.into();
        self.tx.send_modify(|state| state.search_query = query);
    }

    pub fn set_searching(&self, searching: bool) {
        self.tx.send_if_modified(|state| {
            let changed = state.is_searching != searching;
            state.is_searching = searching;
            changed
        });
    }

    pub fn clear_search(&self) {
        self.tx.send_modify(|state| {
            state.search_results.clear();
            state.search_query.clear();
            state.is_searching = false;
        });
    }

    /// Back to the empty state, e.g. on logout.
    pub fn reset(&self) {
        self.tx.send_replace(FilmState::default());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WatchStatus;

    fn film(id: i32, title: &str) -> Film {
        Film {
            id,
            imdb_id: Some(format!("tt{id:07}")),
            tmdb_id: None,
            title: title.to_string(),
            year: Some(1999),
            genre: Some("Sci-Fi".to_string()),
            director: None,
            actors: None,
            plot: None,
            poster: None,
            rating: Some(8.7),
            runtime: None,
            language: None,
            country: None,
            awards: None,
            kind: None,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    fn entry(film_id: i32, status: WatchStatus) -> WatchlistEntry {
        WatchlistEntry {
            item: WatchlistItem {
                id: film_id * 10,
                user_id: 1,
                film_id,
                status,
                personal_rating: None,
                notes: None,
                watched_date: None,
                created_at: String::new(),
                updated_at: String::new(),
            },
            film: FilmSummary::from(&film(film_id, "Film")),
        }
    }

    #[test]
    fn test_add_replaces_existing_film() {
        let store = FilmStore::new();
        store.add_to_watchlist(entry(1, WatchStatus::WantToWatch));
        store.add_to_watchlist(entry(2, WatchStatus::WantToWatch));
        store.add_to_watchlist(entry(1, WatchStatus::Watched));

        let state = store.snapshot();
        assert_eq!(state.watchlist.len(), 2);
        assert_eq!(
            state.watchlist_entry(1).map(|e| e.item.status),
            Some(WatchStatus::Watched)
        );
    }

    #[test]
    fn test_update_and_remove() {
        let store = FilmStore::new();
        store.set_watchlist(vec![entry(1, WatchStatus::WantToWatch)]);

        let patch = WatchlistPatch {
            status: Some(WatchStatus::Watched),
            personal_rating: Some(9),
            ..WatchlistPatch::default()
        };
        store.update_watchlist_entry(1, &patch);
        let state = store.snapshot();
        let updated = state.watchlist_entry(1).unwrap();
        assert_eq!(updated.item.status, WatchStatus::Watched);
        assert_eq!(updated.item.personal_rating, Some(9));

        store.remove_from_watchlist(1);
        assert!(store.snapshot().watchlist.is_empty());
    }

    #[test]
    fn test_apply_item_only_touches_mirrored_films() {
        let store = FilmStore::new();
        let item = entry(3, WatchStatus::Watching).item;
        assert!(!store.apply_item(item.clone()));

        store.add_to_watchlist(entry(3, WatchStatus::WantToWatch));
        assert!(store.apply_item(item));
        assert_eq!(
            store.snapshot().watchlist_entry(3).map(|e| e.item.status),
            Some(WatchStatus::Watching)
        );
    }

    #[test]
    fn test_clear_search() {
        let store = FilmStore::new();
        store.set_search_query("matrix");
        store.set_searching(true);
        store.set_search_results(vec![film(1, "The Matrix")]);

        store.clear_search();
        let state = store.snapshot();
        assert!(state.search_results.is_empty());
        assert!(state.search_query.is_empty());
        assert!(!state.is_searching);
    }

    #[test]
    fn test_film_summary_lookup() {
        let store = FilmStore::new();
        store.set_recommendations(vec![film(4, "Heat")]);
        store.set_current_film(Some(film(5, "Alien")));

        let state = store.snapshot();
        assert_eq!(state.film_summary(4).map(|f| f.title).as_deref(), Some("Heat"));
        assert_eq!(state.film_summary(5).map(|f| f.title).as_deref(), Some("Alien"));
        assert!(state.film_summary(6).is_none());
    }
}
