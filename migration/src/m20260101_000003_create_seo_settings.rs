use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SeoSettings::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SeoSettings::ClientId)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SeoSettings::Keywords).json().not_null())
                    .col(ColumnDef::new(SeoSettings::Location).string())
                    .col(ColumnDef::new(SeoSettings::Industry).string().not_null())
                    .col(ColumnDef::new(SeoSettings::MetaTitle).string())
                    .col(ColumnDef::new(SeoSettings::MetaDescription).text())
                    .col(ColumnDef::new(SeoSettings::SourceUrl).string().not_null())
                    .col(
                        ColumnDef::new(SeoSettings::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SeoSettings::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum SeoSettings {
    Table,
    ClientId,
    Keywords,
    Location,
    Industry,
    MetaTitle,
    MetaDescription,
    SourceUrl,
    UpdatedAt,
}
