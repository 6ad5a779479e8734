use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Checkins::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Checkins::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Checkins::UserId).string().not_null())
                    .col(ColumnDef::new(Checkins::Date).string().not_null())
                    .col(ColumnDef::new(Checkins::Streak).integer().not_null())
                    .col(
                        ColumnDef::new(Checkins::CreatedAt)
                            .date_time()
                            .default(Expr::current_timestamp())
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // One check-in per user per calendar day, enforced by the store.
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_checkins_user_id_date")
                    .table(Checkins::Table)
                    .col(Checkins::UserId)
                    .col(Checkins::Date)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Checkins::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Checkins {
    Table,
    Id,
    UserId,
    Date,
    Streak,
    CreatedAt,
}
