pub mod film;
pub mod user;
pub mod watchlist;
