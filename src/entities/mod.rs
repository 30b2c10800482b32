pub mod prelude;

pub mod films;
pub mod users;
pub mod watchlist;
