// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::*;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::models::workflow::{
    CrawlOutcome, ProviderKind, RunStatus, StepName, StepRecord, StepStatus, WorkflowRun,
};
use crate::domain::repositories::workflow_run_repository::{
    RepositoryError, WorkflowRunRepository,
};
use crate::infrastructure::database::entities::{workflow_run, workflow_step};

/// 工作流运行仓库实现
pub struct WorkflowRunRepositoryImpl {
    db: Arc<DatabaseConnection>,
}

impl WorkflowRunRepositoryImpl {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

fn parse_status(raw: &str) -> Result<RunStatus, RepositoryError> {
    raw.parse()
        .map_err(|_| RepositoryError::Serialization(format!("Invalid run status: {}", raw)))
}

fn parse_step_status(raw: &str) -> Result<StepStatus, RepositoryError> {
    raw.parse()
        .map_err(|_| RepositoryError::Serialization(format!("Invalid step status: {}", raw)))
}

fn outcome_to_json(
    outcome: &Option<CrawlOutcome>,
) -> Result<Option<serde_json::Value>, RepositoryError> {
    outcome
        .as_ref()
        .map(serde_json::to_value)
        .transpose()
        .map_err(|e| RepositoryError::Serialization(e.to_string()))
}

fn step_from_model(m: workflow_step::Model) -> Result<StepRecord, RepositoryError> {
    let name: StepName = m
        .name
        .parse()
        .map_err(|_| RepositoryError::Serialization(format!("Invalid step name: {}", m.name)))?;

    Ok(StepRecord {
        name,
        status: parse_step_status(&m.status)?,
        ordinal: m.ordinal,
        output: m.output,
        error: m.error,
        attempts: m.attempts.max(0) as u32,
        started_at: m.started_at.map(Into::into),
        completed_at: m.completed_at.map(Into::into),
    })
}

fn run_from_model(
    m: workflow_run::Model,
    steps: Vec<workflow_step::Model>,
) -> Result<WorkflowRun, RepositoryError> {
    let provider: ProviderKind = m
        .provider
        .parse()
        .map_err(|_| RepositoryError::Serialization(format!("Invalid provider: {}", m.provider)))?;

    let result = m
        .result
        .map(serde_json::from_value::<CrawlOutcome>)
        .transpose()
        .map_err(|e| RepositoryError::Serialization(e.to_string()))?;

    let mut steps = steps
        .into_iter()
        .map(step_from_model)
        .collect::<Result<Vec<_>, _>>()?;
    steps.sort_by_key(|s| s.ordinal);

    Ok(WorkflowRun {
        id: m.id,
        caller_id: m.caller_id,
        client_id: m.client_id,
        root_url: m.root_url,
        provider,
        max_pages: m.max_pages.max(0) as usize,
        status: parse_status(&m.status)?,
        steps,
        result,
        error: m.error,
        created_at: m.created_at.into(),
        updated_at: m.updated_at.into(),
        started_at: m.started_at.map(Into::into),
        completed_at: m.completed_at.map(Into::into),
    })
}

impl WorkflowRunRepositoryImpl {
    async fn load_steps(&self, run_id: Uuid) -> Result<Vec<workflow_step::Model>, RepositoryError> {
        Ok(workflow_step::Entity::find()
            .filter(workflow_step::Column::RunId.eq(run_id))
            .order_by_asc(workflow_step::Column::Ordinal)
            .all(self.db.as_ref())
            .await?)
    }
}

#[async_trait]
impl WorkflowRunRepository for WorkflowRunRepositoryImpl {
    async fn create(&self, run: &WorkflowRun) -> Result<WorkflowRun, RepositoryError> {
        let model = workflow_run::ActiveModel {
            id: Set(run.id),
            caller_id: Set(run.caller_id.clone()),
            client_id: Set(run.client_id.clone()),
            root_url: Set(run.root_url.clone()),
            provider: Set(run.provider.to_string()),
            max_pages: Set(i32::try_from(run.max_pages).unwrap_or(i32::MAX)),
            status: Set(run.status.to_string()),
            result: Set(outcome_to_json(&run.result)?),
            error: Set(run.error.clone()),
            created_at: Set(run.created_at.into()),
            updated_at: Set(run.updated_at.into()),
            started_at: Set(run.started_at.map(Into::into)),
            completed_at: Set(run.completed_at.map(Into::into)),
        };

        model.insert(self.db.as_ref()).await?;

        for step in &run.steps {
            self.upsert_step(run.id, step).await?;
        }

        Ok(run.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<WorkflowRun>, RepositoryError> {
        let model = workflow_run::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await?;

        match model {
            Some(m) => {
                let steps = self.load_steps(id).await?;
                Ok(Some(run_from_model(m, steps)?))
            }
            None => Ok(None),
        }
    }

    async fn update_run(&self, run: &WorkflowRun) -> Result<WorkflowRun, RepositoryError> {
        let existing = workflow_run::Entity::find_by_id(run.id)
            .one(self.db.as_ref())
            .await?
            .ok_or(RepositoryError::NotFound)?;

        let current = parse_status(&existing.status)?;
        if !current.can_transition_to(run.status) {
            return Err(RepositoryError::InvalidTransition {
                from: current,
                to: run.status,
            });
        }

        // Compare-and-set on the status that was read
        let result = workflow_run::Entity::update_many()
            .col_expr(workflow_run::Column::Status, Expr::value(run.status.to_string()))
            .col_expr(workflow_run::Column::Result, Expr::value(outcome_to_json(&run.result)?))
            .col_expr(workflow_run::Column::Error, Expr::value(run.error.clone()))
            .col_expr(
                workflow_run::Column::UpdatedAt,
                Expr::value::<DateTime<FixedOffset>>(run.updated_at.into()),
            )
            .col_expr(
                workflow_run::Column::StartedAt,
                Expr::value::<Option<DateTime<FixedOffset>>>(run.started_at.map(Into::into)),
            )
            .col_expr(
                workflow_run::Column::CompletedAt,
                Expr::value::<Option<DateTime<FixedOffset>>>(run.completed_at.map(Into::into)),
            )
            .filter(workflow_run::Column::Id.eq(run.id))
            .filter(workflow_run::Column::Status.eq(existing.status.clone()))
            .exec(self.db.as_ref())
            .await?;

        if result.rows_affected != 1 {
            let latest = workflow_run::Entity::find_by_id(run.id)
                .one(self.db.as_ref())
                .await?
                .ok_or(RepositoryError::NotFound)?;
            return Err(RepositoryError::InvalidTransition {
                from: parse_status(&latest.status)?,
                to: run.status,
            });
        }

        Ok(run.clone())
    }

    async fn upsert_step(&self, run_id: Uuid, step: &StepRecord) -> Result<(), RepositoryError> {
        let model = workflow_step::ActiveModel {
            run_id: Set(run_id),
            name: Set(step.name.to_string()),
            ordinal: Set(step.ordinal),
            status: Set(step.status.to_string()),
            output: Set(step.output.clone()),
            error: Set(step.error.clone()),
            attempts: Set(i32::try_from(step.attempts).unwrap_or(i32::MAX)),
            started_at: Set(step.started_at.map(Into::into)),
            completed_at: Set(step.completed_at.map(Into::into)),
        };

        workflow_step::Entity::insert(model)
            .on_conflict(
                OnConflict::columns([workflow_step::Column::RunId, workflow_step::Column::Name])
                    .update_columns([
                        workflow_step::Column::Status,
                        workflow_step::Column::Output,
                        workflow_step::Column::Error,
                        workflow_step::Column::Attempts,
                        workflow_step::Column::StartedAt,
                        workflow_step::Column::CompletedAt,
                    ])
                    .to_owned(),
            )
            .exec(self.db.as_ref())
            .await?;

        Ok(())
    }

    async fn find_unfinished(&self) -> Result<Vec<WorkflowRun>, RepositoryError> {
        let models = workflow_run::Entity::find()
            .filter(
                workflow_run::Column::Status
                    .is_in([RunStatus::Pending.to_string(), RunStatus::Running.to_string()]),
            )
            .order_by_asc(workflow_run::Column::CreatedAt)
            .all(self.db.as_ref())
            .await?;

        let mut runs = Vec::with_capacity(models.len());
        for m in models {
            let steps = self.load_steps(m.id).await?;
            runs.push(run_from_model(m, steps)?);
        }
        Ok(runs)
    }
}
