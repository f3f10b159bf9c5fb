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
                    .table(Emails::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Emails::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Emails::DomainId).integer().not_null())
                    .col(ColumnDef::new(Emails::Email).string().not_null())
                    .col(ColumnDef::new(Emails::Confidence).integer().not_null().default(0))
                    .col(ColumnDef::new(Emails::IsValid).boolean().not_null().default(false))
                    .col(ColumnDef::new(Emails::Reason).string().not_null().default(""))
                    .col(ColumnDef::new(Emails::Source).string().not_null())
                    .col(
                        ColumnDef::new(Emails::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_emails_domain")
                            .from(Emails::Table, Emails::DomainId)
                            .to(Domains::Table, Domains::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // One row per (domain, email); re-verification overwrites
        manager
            .create_index(
                Index::create()
                    .name("idx_emails_domain_email")
                    .table(Emails::Table)
                    .col(Emails::DomainId)
                    .col(Emails::Email)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Emails::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Emails {
    Table,
    Id,
    DomainId,
    Email,
    Confidence,
    IsValid,
    Reason,
    Source,
    CreatedAt,
}
