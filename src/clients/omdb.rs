use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use super::{
    ExternalFilm, ExternalSearch, ProviderError, clean, parse_rating, parse_runtime, parse_year,
};

const SERVICE: &str = "OMDb";

#[derive(Debug, Deserialize)]
struct OmdbSearchResponse {
    #[serde(rename = "Response")]
    response: String,
    #[serde(rename = "Search", default)]
    search: Vec<OmdbSearchItem>,
    #[serde(rename = "totalResults")]
    total_results: Option<String>,
    #[serde(rename = "Error")]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OmdbSearchItem {
    #[serde(rename = "Title")]
    title: String,
    #[serde(rename = "Year")]
    year: Option<String>,
    #[serde(rename = "imdbID")]
    imdb_id: String,
    #[serde(rename = "Type")]
    kind: Option<String>,
    #[serde(rename = "Poster")]
    poster: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct OmdbDetail {
    response: String,
    title: Option<String>,
    year: Option<String>,
    runtime: Option<String>,
    genre: Option<String>,
    director: Option<String>,
    actors: Option<String>,
    plot: Option<String>,
    language: Option<String>,
    country: Option<String>,
    awards: Option<String>,
    poster: Option<String>,
    #[serde(rename = "imdbRating")]
    imdb_rating: Option<String>,
    #[serde(rename = "imdbID")]
    imdb_id: Option<String>,
    #[serde(rename = "Type")]
    kind: Option<String>,
}

impl From<OmdbSearchItem> for ExternalFilm {
    fn from(item: OmdbSearchItem) -> Self {
        Self {
            imdb_id: clean(Some(item.imdb_id.as_str())),
            title: item.title,
            year: parse_year(item.year.as_deref()),
            poster: clean(item.poster.as_deref()),
            kind: clean(item.kind.as_deref()),
            ..Self::default()
        }
    }
}

impl OmdbDetail {
    fn into_external(self, requested_id: &str) -> ExternalFilm {
        ExternalFilm {
            imdb_id: clean(self.imdb_id.as_deref()).or_else(|| Some(requested_id.to_string())),
            tmdb_id: None,
            title: clean(self.title.as_deref()).unwrap_or_else(|| requested_id.to_string()),
            year: parse_year(self.year.as_deref()),
            genre: clean(self.genre.as_deref()),
            director: clean(self.director.as_deref()),
            actors: clean(self.actors.as_deref()),
            plot: clean(self.plot.as_deref()),
            poster: clean(self.poster.as_deref()),
            rating: parse_rating(self.imdb_rating.as_deref()),
            runtime: parse_runtime(self.runtime.as_deref()),
            language: clean(self.language.as_deref()),
            country: clean(self.country.as_deref()),
            awards: clean(self.awards.as_deref()),
            kind: clean(self.kind.as_deref()),
        }
    }
}

#[derive(Clone)]
pub struct OmdbClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl OmdbClient {
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

    async fn get<T: for<'de> Deserialize<'de>>(&self, params: &str) -> Result<T, ProviderError> {
        let url = format!(
            "{}/?apikey={}&{}",
            self.base_url,
            urlencoding::encode(&self.api_key),
            params
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

        response
            .json()
            .await
            .map_err(|e| ProviderError::upstream(SERVICE, e))
    }

    /// Movie title search, one provider page at a time.
    pub async fn search(&self, query: &str, page: u64) -> Result<ExternalSearch, ProviderError> {
        let params = format!("s={}&page={}&type=movie", urlencoding::encode(query), page.max(1));
        let response: OmdbSearchResponse = self.get(&params).await?;

        if response.response != "True" {
            tracing::debug!(
                query,
                error = response.error.as_deref().unwrap_or("unknown"),
                "OMDb search returned no results"
            );
            return Ok(ExternalSearch::default());
        }

        let films: Vec<ExternalFilm> = response.search.into_iter().map(ExternalFilm::from).collect();
        let total_results = response
            .total_results
            .as_deref()
            .and_then(|t| t.parse().ok())
            .unwrap_or(films.len() as u64);

        Ok(ExternalSearch {
            films,
            total_results,
        })
    }

    /// Full-plot record for an IMDb id.
    pub async fn details(&self, imdb_id: &str) -> Result<Option<ExternalFilm>, ProviderError> {
        let params = format!("i={}&plot=full", urlencoding::encode(imdb_id));
        let response: OmdbDetail = self.get(&params).await?;

        if response.response != "True" {
            return Ok(None);
        }

        Ok(Some(response.into_external(imdb_id)))
    }
}
