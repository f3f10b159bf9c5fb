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
                    .table(ScrapingLogs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ScrapingLogs::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ScrapingLogs::DomainId).integer().not_null())
                    .col(
                        ColumnDef::new(ScrapingLogs::Timestamp)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ScrapingLogs::Message).text().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_logs_domain")
                            .from(ScrapingLogs::Table, ScrapingLogs::DomainId)
                            .to(Domains::Table, Domains::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_logs_domain")
                    .table(ScrapingLogs::Table)
                    .col(ScrapingLogs::DomainId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ScrapingLogs::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ScrapingLogs {
    Table,
    Id,
    DomainId,
    Timestamp,
    Message,
}
