use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Users::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Users::Email).string().not_null().unique_key())
                    .col(ColumnDef::new(Users::PasswordHash).string().not_null())
                    .col(ColumnDef::new(Users::Name).string().not_null())
                    .col(
                        ColumnDef::new(Users::FavoriteGenres)
                            .text()
                            .not_null()
                            .default("[]"),
                    )
                    .col(ColumnDef::new(Users::CreatedAt).string().not_null())
                    .col(ColumnDef::new(Users::UpdatedAt).string().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Films::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Films::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Films::ImdbId).string().null().unique_key())
                    .col(ColumnDef::new(Films::TmdbId).big_integer().null())
                    .col(ColumnDef::new(Films::Title).string().not_null())
                    .col(ColumnDef::new(Films::Year).integer().null())
                    .col(ColumnDef::new(Films::Genre).string().null())
                    .col(ColumnDef::new(Films::Director).string().null())
                    .col(ColumnDef::new(Films::Actors).text().null())
                    .col(ColumnDef::new(Films::Plot).text().null())
                    .col(ColumnDef::new(Films::Poster).string().null())
                    .col(ColumnDef::new(Films::Rating).double().null())
                    .col(ColumnDef::new(Films::Runtime).integer().null())
                    .col(ColumnDef::new(Films::Language).string().null())
                    .col(ColumnDef::new(Films::Country).string().null())
                    .col(ColumnDef::new(Films::Awards).string().null())
                    .col(ColumnDef::new(Films::Kind).string().null())
                    .col(ColumnDef::new(Films::CreatedAt).string().not_null())
                    .col(ColumnDef::new(Films::UpdatedAt).string().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Watchlist::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Watchlist::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Watchlist::UserId).integer().not_null())
                    .col(ColumnDef::new(Watchlist::FilmId).integer().not_null())
                    .col(
                        ColumnDef::new(Watchlist::Status)
                            .string()
                            .not_null()
                            .default("want_to_watch")
                            .check(Expr::col(Watchlist::Status).is_in([
                                "want_to_watch",
                                "watching",
                                "watched",
                            ])),
                    )
                    .col(
                        ColumnDef::new(Watchlist::PersonalRating)
                            .integer()
                            .null()
                            .check(Expr::col(Watchlist::PersonalRating).between(1, 10)),
                    )
                    .col(ColumnDef::new(Watchlist::Notes).text().null())
                    .col(ColumnDef::new(Watchlist::WatchedDate).string().null())
                    .col(ColumnDef::new(Watchlist::CreatedAt).string().not_null())
                    .col(ColumnDef::new(Watchlist::UpdatedAt).string().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_watchlist_user_id")
                            .from(Watchlist::Table, Watchlist::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::NoAction),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_watchlist_film_id")
                            .from(Watchlist::Table, Watchlist::FilmId)
                            .to(Films::Table, Films::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::NoAction),
                    )
                    .to_owned(),
            )
            .await?;

        // One row per (user, film); add-to-watchlist upserts against this index.
        manager
            .create_index(
                Index::create()
                    .name("idx_watchlist_user_film")
                    .table(Watchlist::Table)
                    .col(Watchlist::UserId)
                    .col(Watchlist::FilmId)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Watchlist::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Films::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Email,
    PasswordHash,
    Name,
    FavoriteGenres,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Films {
    Table,
    Id,
    ImdbId,
    TmdbId,
    Title,
    Year,
    Genre,
    Director,
    Actors,
    Plot,
    Poster,
    Rating,
    Runtime,
    Language,
    Country,
    Awards,
    Kind,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Watchlist {
    Table,
    Id,
    UserId,
    FilmId,
    Status,
    PersonalRating,
    Notes,
    WatchedDate,
    CreatedAt,
    UpdatedAt,
}
