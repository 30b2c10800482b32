//! Client-side state for the mobile app: session, HTTP transport, query cache
//! and the film/watchlist view store, wired together by [`FilmlogClient`].

mod app;
mod film_store;
mod query_cache;
mod session;
mod transport;

pub use app::FilmlogClient;
pub use film_store::{FilmState, FilmStore};
pub use query_cache::{CachePolicy, QueryCache, QueryKey};
pub use session::{Session, SessionStore};
pub use transport::{ApiClient, REQUEST_TIMEOUT};

use thiserror::Error;

/// Failure of a client-side request. `Clone` so a single in-flight fetch can
/// be awaited by several callers.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClientError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    Decode(String),
}

impl ClientError {
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }

    /// Server-provided message, if the server answered at all.
    #[must_use]
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Unauthorized(msg) | Self::Api { message: msg, .. } => Some(msg),
            Self::Network(_) | Self::Decode(_) => None,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}
