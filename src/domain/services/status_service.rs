// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::models::workflow::{CrawlOutcome, RunStatus, StepStatus, WorkflowRun};

/// 对外报告的运行状态
///
/// 无法识别的状态字符串解析为 `Unknown`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportedStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
    #[serde(other)]
    Unknown,
}

impl ReportedStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ReportedStatus::Completed | ReportedStatus::Failed | ReportedStatus::Cancelled
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportedStatus::Pending => "pending",
            ReportedStatus::Running => "running",
            ReportedStatus::Completed => "completed",
            ReportedStatus::Failed => "failed",
            ReportedStatus::Cancelled => "cancelled",
            ReportedStatus::Unknown => "unknown",
        }
    }
}

impl From<RunStatus> for ReportedStatus {
    fn from(status: RunStatus) -> Self {
        match status {
            RunStatus::Pending => ReportedStatus::Pending,
            RunStatus::Running => ReportedStatus::Running,
            RunStatus::Completed => ReportedStatus::Completed,
            RunStatus::Failed => ReportedStatus::Failed,
            RunStatus::Cancelled => ReportedStatus::Cancelled,
        }
    }
}

/// 运行状态报告
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub run_id: Uuid,
    pub status: ReportedStatus,
    pub current_step: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<CrawlOutcome>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

const PROCESSING: &str = "processing";

/// 生成运行的状态报告，只读
pub fn report(run: &WorkflowRun) -> StatusReport {
    StatusReport {
        run_id: run.id,
        status: run.status.into(),
        current_step: current_step_label(run),
        result: run.result.clone(),
        error: run.error.clone(),
    }
}

fn current_step_label(run: &WorkflowRun) -> String {
    match run.status {
        RunStatus::Pending => PROCESSING.to_string(),
        RunStatus::Running => running_label(run).to_string(),
        terminal => terminal.to_string(),
    }
}

fn running_label(run: &WorkflowRun) -> &'static str {
    if let Some(step) = run.steps.iter().find(|s| s.status == StepStatus::Running) {
        return step.name.progress_label();
    }

    run.steps
        .iter()
        .filter(|s| s.status == StepStatus::Completed)
        .max_by_key(|s| s.ordinal)
        .and_then(|s| s.name.next())
        .map(|next| next.progress_label())
        .unwrap_or(PROCESSING)
}
