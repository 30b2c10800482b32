pub mod token;
pub use token::TokenService;

pub mod auth_service;
pub use auth_service::{AuthError, AuthService};

pub mod auth_service_impl;
pub use auth_service_impl::SeaOrmAuthService;

pub mod film_service;
pub use film_service::{FilmError, FilmService};

pub mod film_service_impl;
pub use film_service_impl::SeaOrmFilmService;

pub mod watchlist_service;
pub use watchlist_service::{WatchlistError, WatchlistService};

pub mod watchlist_service_impl;
pub use watchlist_service_impl::SeaOrmWatchlistService;
