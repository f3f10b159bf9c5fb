use sea_orm_migration::prelude::*;

use super::m20250101_000001_create_domains::Domains;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ScrapingSessions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ScrapingSessions::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ScrapingSessions::DomainId).integer().not_null())
                    .col(ColumnDef::new(ScrapingSessions::Status).string().not_null())
                    .col(
                        ColumnDef::new(ScrapingSessions::StartedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(ScrapingSessions::CompletedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(ScrapingSessions::TotalEmailsFound)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(ScrapingSessions::TotalEmailsVerified)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_sessions_domain")
                            .from(ScrapingSessions::Table, ScrapingSessions::DomainId)
                            .to(Domains::Table, Domains::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_sessions_started_at")
                    .table(ScrapingSessions::Table)
                    .col(ScrapingSessions::StartedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ScrapingSessions::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ScrapingSessions {
    Table,
    Id,
    DomainId,
    Status,
    StartedAt,
    CompletedAt,
    TotalEmailsFound,
    TotalEmailsVerified,
}
