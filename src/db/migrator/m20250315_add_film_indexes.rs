use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Popular listing sorts by creation time
        manager
            .create_index(
                Index::create()
                    .name("idx_films_created_at")
                    .table(Films::Table)
                    .col(Films::CreatedAt)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_watchlist_user_updated")
                    .table(Watchlist::Table)
                    .col(Watchlist::UserId)
                    .col(Watchlist::UpdatedAt)
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_watchlist_user_updated")
                    .table(Watchlist::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_index(
                Index::drop()
                    .name("idx_films_created_at")
                    .table(Films::Table)
                    .to_owned(),
            )
            .await
    }
}

#[derive(DeriveIden)]
enum Films {
    Table,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Watchlist {
    Table,
    UserId,
    UpdatedAt,
}
