//! External film metadata sources.

use async_trait::async_trait;
use thiserror::Error;

use crate::config::ProvidersConfig;
use crate::models::TrendingFilm;

pub mod omdb;
pub mod tmdb;

pub use omdb::OmdbClient;
pub use tmdb::TmdbClient;

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("{0} API not configured")]
    NotConfigured(&'static str),

    #[error("{service} API error: {message}")]
    Upstream {
        service: &'static str,
        message: String,
    },
}

impl ProviderError {
    pub fn upstream(service: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Upstream {
            service,
            message: err.to_string(),
        }
    }
}

/// Normalized film record as returned by a provider, ready to be stored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExternalFilm {
    pub imdb_id: Option<String>,
    pub tmdb_id: Option<i64>,
    pub title: String,
    pub year: Option<i32>,
    pub genre: Option<String>,
    pub director: Option<String>,
    pub actors: Option<String>,
    pub plot: Option<String>,
    pub poster: Option<String>,
    pub rating: Option<f64>,
    pub runtime: Option<i32>,
    pub language: Option<String>,
    pub country: Option<String>,
    pub awards: Option<String>,
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ExternalSearch {
    pub films: Vec<ExternalFilm>,
    pub total_results: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrendingWindow {
    Day,
    #[default]
    Week,
}

impl TrendingWindow {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "day" => Some(Self::Day),
            "week" => Some(Self::Week),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Week => "week",
        }
    }
}

#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Title search. An unconfigured or empty result is an empty `ExternalSearch`.
    async fn search(&self, query: &str, page: u64) -> Result<ExternalSearch, ProviderError>;

    /// Full record for an IMDb id, `None` when the provider does not know it.
    async fn details(&self, imdb_id: &str) -> Result<Option<ExternalFilm>, ProviderError>;

    async fn trending(&self, window: TrendingWindow) -> Result<Vec<TrendingFilm>, ProviderError>;
}

/// OMDb for search and details, TMDB for trending. Either may be absent.
#[derive(Clone, Default)]
pub struct FilmProviders {
    omdb: Option<OmdbClient>,
    tmdb: Option<TmdbClient>,
}

impl FilmProviders {
    #[must_use]
    pub const fn new(omdb: Option<OmdbClient>, tmdb: Option<TmdbClient>) -> Self {
        Self { omdb, tmdb }
    }

    #[must_use]
    pub fn from_config(config: &ProvidersConfig) -> Self {
        let timeout = std::time::Duration::from_secs(config.request_timeout_seconds);

        let omdb = config
            .omdb_api_key
            .as_ref()
            .map(|key| OmdbClient::new(&config.omdb_base_url, key, timeout));
        let tmdb = config
            .tmdb_api_key
            .as_ref()
            .map(|key| TmdbClient::new(&config.tmdb_base_url, key, timeout));

        Self { omdb, tmdb }
    }
}

#[async_trait]
impl MetadataProvider for FilmProviders {
    async fn search(&self, query: &str, page: u64) -> Result<ExternalSearch, ProviderError> {
        match &self.omdb {
            Some(omdb) => omdb.search(query, page).await,
            None => Ok(ExternalSearch::default()),
        }
    }

    async fn details(&self, imdb_id: &str) -> Result<Option<ExternalFilm>, ProviderError> {
        match &self.omdb {
            Some(omdb) => omdb.details(imdb_id).await,
            None => Err(ProviderError::NotConfigured("OMDb")),
        }
    }

    async fn trending(&self, window: TrendingWindow) -> Result<Vec<TrendingFilm>, ProviderError> {
        match &self.tmdb {
            Some(tmdb) => tmdb.trending(window).await,
            None => Err(ProviderError::NotConfigured("TMDB")),
        }
    }
}

/// `"N/A"`, empty and whitespace-only provider strings mean "unknown".
pub(crate) fn clean(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("N/A"))
        .map(ToString::to_string)
}

/// First run of four digits, e.g. `"2019–2021"` → 2019.
pub(crate) fn parse_year(value: Option<&str>) -> Option<i32> {
    let value = clean(value)?;
    let bytes = value.as_bytes();
    bytes
        .windows(4)
        .find(|w| w.iter().all(u8::is_ascii_digit))
        .and_then(|w| std::str::from_utf8(w).ok())
        .and_then(|s| s.parse().ok())
}

pub(crate) fn parse_rating(value: Option<&str>) -> Option<f64> {
    clean(value)?.parse::<f64>().ok().filter(|r| r.is_finite())
}

/// `"142 min"` → 142.
pub(crate) fn parse_runtime(value: Option<&str>) -> Option<i32> {
    let value = clean(value)?;
    let digits: String = value.chars().take_while(char::is_ascii_digit).collect();
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinels_normalize_to_none() {
        assert_eq!(clean(Some("N/A")), None);
        assert_eq!(clean(Some("  ")), None);
        assert_eq!(clean(None), None);
        assert_eq!(clean(Some(" Drama ")), Some("Drama".to_string()));
    }

    #[test]
    fn test_numeric_fields_parse_or_vanish() {
        assert_eq!(parse_year(Some("1995")), Some(1995));
        assert_eq!(parse_year(Some("2019–2021")), Some(2019));
        assert_eq!(parse_year(Some("N/A")), None);
        assert_eq!(parse_rating(Some("8.3")), Some(8.3));
        assert_eq!(parse_rating(Some("N/A")), None);
        assert_eq!(parse_rating(Some("NaN")), None);
        assert_eq!(parse_runtime(Some("170 min")), Some(170));
        assert_eq!(parse_runtime(Some("N/A")), None);
        assert_eq!(parse_runtime(Some("unknown")), None);
    }

    #[test]
    fn test_trending_window_parses_known_values() {
        assert_eq!(TrendingWindow::parse("day"), Some(TrendingWindow::Day));
        assert_eq!(TrendingWindow::parse("week"), Some(TrendingWindow::Week));
        assert_eq!(TrendingWindow::parse("month"), None);
        assert_eq!(TrendingWindow::default().as_str(), "week");
    }

    #[tokio::test]
    async fn test_unconfigured_providers_degrade() {
        let providers = FilmProviders::default();
        let search = providers.search("heat", 1).await.unwrap();
        assert!(search.films.is_empty());
        assert!(matches!(
            providers.details("tt0113277").await,
            Err(ProviderError::NotConfigured("OMDb"))
        ));
        assert!(matches!(
            providers.trending(TrendingWindow::Week).await,
            Err(ProviderError::NotConfigured("TMDB"))
        ));
    }
}
