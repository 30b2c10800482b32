use anyhow::{Context, Result};
use sea_orm::sea_query::{Expr, Func, LikeExpr, OnConflict};
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};

use crate::clients::ExternalFilm;
use crate::entities::films;
use crate::models::Film;

/// One page of a local catalog search.
#[derive(Debug, Clone)]
pub struct FilmPage {
    pub films: Vec<Film>,
    /// Number of local matches across all pages.
    pub total: u64,
}

pub struct FilmRepository {
    conn: DatabaseConnection,
}

impl FilmRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get(&self, id: i32) -> Result<Option<Film>> {
        let film = films::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query film by ID")?;

        Ok(film.map(Film::from))
    }

    pub async fn get_by_imdb_id(&self, imdb_id: &str) -> Result<Option<Film>> {
        let film = films::Entity::find()
            .filter(films::Column::ImdbId.eq(imdb_id))
            .one(&self.conn)
            .await
            .context("Failed to query film by IMDb ID")?;

        Ok(film.map(Film::from))
    }

    /// Case-insensitive substring match over title, director and actors.
    /// `page` is 1-based.
    pub async fn search(&self, query: &str, page: u64, page_size: u64) -> Result<FilmPage> {
        let pattern = format!("%{}%", escape_like(&query.to_lowercase()));

        let matches = |col: films::Column| {
            Expr::expr(Func::lower(Expr::col((films::Entity, col))))
                .like(LikeExpr::new(pattern.clone()).escape('\\'))
        };

        let condition = Condition::any()
            .add(matches(films::Column::Title))
            .add(matches(films::Column::Director))
            .add(matches(films::Column::Actors));

        let paginator = films::Entity::find()
            .filter(condition)
            .order_by_asc(films::Column::Title)
            .order_by_asc(films::Column::Id)
            .paginate(&self.conn, page_size.max(1));

        let total = paginator
            .num_items()
            .await
            .context("Failed to count film search matches")?;

        let models = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .context("Failed to fetch film search page")?;

        Ok(FilmPage {
            films: models.into_iter().map(Film::from).collect(),
            total,
        })
    }

    /// Most recently added films first.
    pub async fn newest(&self, limit: u64) -> Result<Vec<Film>> {
        let models = films::Entity::find()
            .order_by_desc(films::Column::CreatedAt)
            .order_by_desc(films::Column::Id)
            .limit(limit)
            .all(&self.conn)
            .await
            .context("Failed to list newest films")?;

        Ok(models.into_iter().map(Film::from).collect())
    }

    /// Inserts a provider record unless one with the same IMDb id exists.
    /// The stored row wins; the returned film is whatever is persisted.
    pub async fn insert_if_absent(&self, film: &ExternalFilm) -> Result<Film> {
        let now = crate::db::timestamp();
        let active = to_active_model(film, &now);

        let Some(imdb_id) = film.imdb_id.as_deref() else {
            let inserted = active
                .insert(&self.conn)
                .await
                .context("Failed to insert film")?;
            return Ok(Film::from(inserted));
        };

        films::Entity::insert(active)
            .on_conflict(
                OnConflict::column(films::Column::ImdbId)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&self.conn)
            .await
            .context("Failed to insert film")?;

        self.get_by_imdb_id(imdb_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Film {imdb_id} missing after insert"))
    }

    /// Inserts a provider record, or overwrites the descriptive columns of the existing row
    /// with the same IMDb id. `imdb_id` and `created_at` are never rewritten.
    pub async fn upsert_details(&self, film: &ExternalFilm) -> Result<Film> {
        let Some(imdb_id) = film.imdb_id.as_deref() else {
            return self.insert_if_absent(film).await;
        };

        let now = crate::db::timestamp();

        films::Entity::insert(to_active_model(film, &now))
            .on_conflict(
                OnConflict::column(films::Column::ImdbId)
                    .update_columns([
                        films::Column::TmdbId,
                        films::Column::Title,
                        films::Column::Year,
                        films::Column::Genre,
                        films::Column::Director,
                        films::Column::Actors,
                        films::Column::Plot,
                        films::Column::Poster,
                        films::Column::Rating,
                        films::Column::Runtime,
                        films::Column::Language,
                        films::Column::Country,
                        films::Column::Awards,
                        films::Column::Kind,
                        films::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&self.conn)
            .await
            .context("Failed to upsert film details")?;

        self.get_by_imdb_id(imdb_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Film {imdb_id} missing after upsert"))
    }
}

fn to_active_model(film: &ExternalFilm, now: &str) -> films::ActiveModel {
    films::ActiveModel {
        id: NotSet,
        imdb_id: Set(film.imdb_id.clone()),
        tmdb_id: Set(film.tmdb_id),
        title: Set(film.title.clone()),
        year: Set(film.year),
        genre: Set(film.genre.clone()),
        director: Set(film.director.clone()),
        actors: Set(film.actors.clone()),
        plot: Set(film.plot.clone()),
        poster: Set(film.poster.clone()),
        rating: Set(film.rating),
        runtime: Set(film.runtime),
        language: Set(film.language.clone()),
        country: Set(film.country.clone()),
        awards: Set(film.awards.clone()),
        kind: Set(film.kind.clone()),
        created_at: Set(now.to_string()),
        updated_at: Set(now.to_string()),
    }
}

fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Store;

    fn film(imdb_id: &str, title: &str) -> ExternalFilm {
        ExternalFilm {
            imdb_id: Some(imdb_id.to_string()),
            title: title.to_string(),
            ..ExternalFilm::default()
        }
    }

    async fn repo() -> FilmRepository {
        let store = Store::new("sqlite::memory:").await.unwrap();
        FilmRepository::new(store.conn)
    }

    #[test]
    fn test_like_wildcards_are_escaped() {
        assert_eq!(escape_like("100%_a\\b"), "100\\%\\_a\\\\b");
    }

    #[tokio::test]
    async fn test_insert_if_absent_keeps_existing_row() {
        let repo = repo().await;
        let first = repo.insert_if_absent(&film("tt0113277", "Heat")).await.unwrap();
        let second = repo
            .insert_if_absent(&film("tt0113277", "Heat (duplicate)"))
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.title, "Heat");
    }

    #[tokio::test]
    async fn test_upsert_details_overwrites_descriptive_fields() {
        let repo = repo().await;
        let partial = repo.insert_if_absent(&film("tt0113277", "Heat")).await.unwrap();

        let mut detailed = film("tt0113277", "Heat");
        detailed.plot = Some("A group of high-end professional thieves...".to_string());
        detailed.runtime = Some(170);
        let merged = repo.upsert_details(&detailed).await.unwrap();

        assert_eq!(merged.id, partial.id);
        assert_eq!(merged.created_at, partial.created_at);
        assert_eq!(merged.runtime, Some(170));
        assert!(merged.has_details());
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive_and_paginated() {
        let repo = repo().await;
        for (id, title) in [("tt1", "Alien"), ("tt2", "Aliens"), ("tt3", "Heat")] {
            repo.insert_if_absent(&film(id, title)).await.unwrap();
        }

        let page = repo.search("ALIEN", 1, 1).await.unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.films.len(), 1);
        assert_eq!(page.films[0].title, "Alien");

        let page_two = repo.search("alien", 2, 1).await.unwrap();
        assert_eq!(page_two.films[0].title, "Aliens");

        assert_eq!(repo.search("zzz", 1, 10).await.unwrap().total, 0);
    }

    #[tokio::test]
    async fn test_newest_orders_by_creation() {
        let repo = repo().await;
        repo.insert_if_absent(&film("tt1", "First")).await.unwrap();
        repo.insert_if_absent(&film("tt2", "Second")).await.unwrap();

        let films = repo.newest(1).await.unwrap();
        assert_eq!(films.len(), 1);
        assert_eq!(films[0].title, "Second");
    }
}
