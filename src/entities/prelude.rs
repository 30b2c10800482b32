pub use super::films::Entity as Films;
pub use super::users::Entity as Users;
pub use super::watchlist::Entity as Watchlist;
