use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Domains::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Domains::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Domains::Domain).string().not_null().unique_key())
                    .col(ColumnDef::new(Domains::Status).string().not_null())
                    .col(ColumnDef::new(Domains::TotalEmails).integer().not_null().default(0))
                    .col(ColumnDef::new(Domains::VerifiedEmails).integer().not_null().default(0))
                    .col(
                        ColumnDef::new(Domains::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Domains::LastScrapedAt).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Domains::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub(crate) enum Domains {
    Table,
    Id,
    Domain,
    Status,
    TotalEmails,
    VerifiedEmails,
    CreatedAt,
    LastScrapedAt,
}
