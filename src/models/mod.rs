pub mod film;
pub mod payload;
pub mod user;
pub mod watchlist;

pub use film::{Film, FilmSummary, TrendingFilm};
pub use user::PublicUser;
pub use watchlist::{WatchStatus, WatchlistEntry, WatchlistItem, WatchlistPatch, WatchlistStats};
