use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use super::{ProviderError, TrendingWindow, clean, parse_year};
use crate::models::TrendingFilm;

const SERVICE: &str = "TMDB";
const IMAGE_BASE: &str = "https://image.tmdb.org/t/p/w500";

#[derive(Debug, Deserialize)]
struct TmdbPage {
    #[serde(default)]
    results: Vec<TmdbMovie>,
}

#[derive(Debug, Deserialize)]
struct TmdbMovie {
    id: i64,
    title: Option<String>,
    release_date: Option<String>,
    overview: Option<String>,
    poster_path: Option<String>,
    vote_average: Option<f64>,
    #[serde(default)]
    genre_ids: Vec<i64>,
}

impl From<TmdbMovie> for TrendingFilm {
    fn from(movie: TmdbMovie) -> Self {
        Self {
            tmdb_id: movie.id,
            title: movie.title.unwrap_or_default(),
            year: parse_year(movie.release_date.as_deref()),
            overview: clean(movie.overview.as_deref()),
            poster: clean(movie.poster_path.as_deref()).map(|p| format!("{IMAGE_BASE}{p}")),
            rating: movie.vote_average,
            genre_ids: movie.genre_ids,
        }
    }
}

#[derive(Clone)]
pub struct TmdbClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl TmdbClient {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .user_agent("Filmlog/1.0")
                .build()
                .unwrap_or_else(|_| Client::new()),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    pub async fn trending(&self, window: TrendingWindow) -> Result<Vec<TrendingFilm>, ProviderError> {
        let url = format!(
            "{}/trending/movie/{}?api_key={}",
            self.base_url,
            window.as_str(),
            urlencoding::encode(&self.api_key)
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ProviderError::upstream(SERVICE, e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::upstream(SERVICE, format!("{status} - {body}")));
        }

        let page: TmdbPage = response
            .json()
            .await
            .map_err(|e| ProviderError::upstream(SERVICE, e))?;

        Ok(page.results.into_iter().map(TrendingFilm::from).collect())
    }
}
