use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "films")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// IMDb identifier (`tt…`). Never changed once set.
    #[sea_orm(unique)]
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

    /// Minutes
    pub runtime: Option<i32>,

    pub language: Option<String>,

    pub country: Option<String>,

    pub awards: Option<String>,

    pub kind: Option<String>,

    pub created_at: String,

    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::watchlist::Entity")]
    Watchlist,
}

impl Related<super::watchlist::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Watchlist.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
