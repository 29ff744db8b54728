use sea_orm_migration::prelude::*;

use super::m20260101_000001_create_workflow_runs::WorkflowRuns;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(WorkflowSteps::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(WorkflowSteps::RunId).uuid().not_null())
                    .col(ColumnDef::new(WorkflowSteps::Name).string().not_null())
                    .col(ColumnDef::new(WorkflowSteps::Ordinal).integer().not_null())
                    .col(ColumnDef::new(WorkflowSteps::Status).string().not_null())
                    .col(ColumnDef::new(WorkflowSteps::Output).json())
                    .col(ColumnDef::new(WorkflowSteps::Error).text())
                    .col(
                        ColumnDef::new(WorkflowSteps::Attempts)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(WorkflowSteps::StartedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(WorkflowSteps::CompletedAt).timestamp_with_time_zone())
                    .primary_key(
                        Index::create()
                            .col(WorkflowSteps::RunId)
                            .col(WorkflowSteps::Name),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_workflow_steps_run")
                            .from(WorkflowSteps::Table, WorkflowSteps::RunId)
                            .to(WorkflowRuns::Table, WorkflowRuns::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(WorkflowSteps::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum WorkflowSteps {
    Table,
    RunId,
    Name,
    Ordinal,
    Status,
    Output,
    Error,
    Attempts,
    StartedAt,
    CompletedAt,
}
