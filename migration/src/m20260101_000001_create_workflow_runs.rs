use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(WorkflowRuns::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(WorkflowRuns::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(WorkflowRuns::CallerId).string().not_null())
                    .col(ColumnDef::new(WorkflowRuns::ClientId).string().not_null())
                    .col(ColumnDef::new(WorkflowRuns::RootUrl).string().not_null())
                    .col(ColumnDef::new(WorkflowRuns::Provider).string().not_null())
                    .col(ColumnDef::new(WorkflowRuns::MaxPages).integer().not_null())
                    .col(ColumnDef::new(WorkflowRuns::Status).string().not_null())
                    .col(ColumnDef::new(WorkflowRuns::Result).json())
                    .col(ColumnDef::new(WorkflowRuns::Error).text())
                    .col(
                        ColumnDef::new(WorkflowRuns::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(WorkflowRuns::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(WorkflowRuns::StartedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(WorkflowRuns::CompletedAt).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await?;

        // Startup resume scans by status
        manager
            .create_index(
                Index::create()
                    .name("idx_workflow_runs_status")
                    .table(WorkflowRuns::Table)
                    .col(WorkflowRuns::Status)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(WorkflowRuns::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum WorkflowRuns {
    Table,
    Id,
    CallerId,
    ClientId,
    RootUrl,
    Provider,
    MaxPages,
    Status,
    Result,
    Error,
    CreatedAt,
    UpdatedAt,
    StartedAt,
    CompletedAt,
}
