use serde::{Deserialize, Serialize};

use crate::entities::films;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Film {
    pub id: i32,
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
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Film {
    /// Whether full details have been fetched at least once.
    #[must_use]
    pub fn has_details(&self) -> bool {
        self.plot.as_deref().is_some_and(|p| !p.trim().is_empty())
    }
}

impl From<films::Model> for Film {
    fn from(model: films::Model) -> Self {
        Self {
            id: model.id,
            imdb_id: model.imdb_id,
            tmdb_id: model.tmdb_id,
            title: model.title,
            year: model.year,
            genre: model.genre,
            director: model.director,
            actors: model.actors,
            plot: model.plot,
            poster: model.poster,
            rating: model.rating,
            runtime: model.runtime,
            language: model.language,
            country: model.country,
            awards: model.awards,
            kind: model.kind,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Film fields embedded in watchlist listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilmSummary {
    pub id: i32,
    pub title: String,
    pub year: Option<i32>,
    pub genre: Option<String>,
    pub poster: Option<String>,
    pub rating: Option<f64>,
}

impl From<films::Model> for FilmSummary {
    fn from(model: films::Model) -> Self {
        Self {
            id: model.id,
            title: model.title,
            year: model.year,
            genre: model.genre,
            poster: model.poster,
            rating: model.rating,
        }
    }
}

impl From<&Film> for FilmSummary {
    fn from(film: &Film) -> Self {
        Self {
            id: film.id,
            title: film.title.clone(),
            year: film.year,
            genre: film.genre.clone(),
            poster: film.poster.clone(),
            rating: film.rating,
        }
    }
}

/// Entry of the provider's trending list. Not persisted locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendingFilm {
    pub tmdb_id: i64,
    pub title: String,
    pub year: Option<i32>,
    pub overview: Option<String>,
    pub poster: Option<String>,
    pub rating: Option<f64>,
    #[serde(default)]
    pub genre_ids: Vec<i64>,
}
