use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "watchlist")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub user_id: i32,

    pub film_id: i32,

    pub status: WatchStatus,

    /// 1..=10
    pub personal_rating: Option<i32>,

    pub notes: Option<String>,

    pub watched_date: Option<String>,

    pub created_at: String,

    pub updated_at: String,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum WatchStatus {
    #[default]
    #[sea_orm(string_value = "want_to_watch")]
    WantToWatch,
    #[sea_orm(string_value = "watching")]
    Watching,
    #[sea_orm(string_value = "watched")]
    Watched,
}

impl WatchStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::WantToWatch => "want_to_watch",
            Self::Watching => "watching",
            Self::Watched => "watched",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "want_to_watch" => Some(Self::WantToWatch),
            "watching" => Some(Self::Watching),
            "watched" => Some(Self::Watched),
            _ => None,
        }
    }
}

impl std::fmt::Display for WatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Users,
    #[sea_orm(
        belongs_to = "super::films::Entity",
        from = "Column::FilmId",
        to = "super::films::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Films,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl Related<super::films::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Films.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
