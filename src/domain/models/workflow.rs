// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::models::seo::SeoAnalysisResult;

/// 领域错误
#[derive(Error, Debug, PartialEq, Eq)]
pub enum DomainError {
    /// 无效的状态转换
    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition { from: RunStatus, to: RunStatus },
}

/// 抓取提供方类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// 逐页抓取的阅读代理
    #[default]
    Reader,
    /// 自带多页爬取的提供方
    Firecrawl,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ProviderKind::Reader => write!(f, "reader"),
            ProviderKind::Firecrawl => write!(f, "firecrawl"),
        }
    }
}

impl FromStr for ProviderKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reader" => Ok(ProviderKind::Reader),
            "firecrawl" => Ok(ProviderKind::Firecrawl),
            _ => Err(()),
        }
    }
}

/// 工作流运行状态
///
/// 状态转换遵循以下流程：
/// Pending → Running → Completed/Failed/Cancelled
///
/// 终态不可再变更
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// 已创建，尚未开始
    #[default]
    Pending,
    /// 执行中
    Running,
    /// 已完成
    Completed,
    /// 已失败
    Failed,
    /// 已取消
    Cancelled,
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunStatus::Completed | RunStatus::Failed | RunStatus::Cancelled
        )
    }

    /// 是否允许从当前状态转换到 `next`
    pub fn can_transition_to(&self, next: RunStatus) -> bool {
        match (self, next) {
            (RunStatus::Pending, RunStatus::Running)
            | (RunStatus::Pending, RunStatus::Failed)
            | (RunStatus::Pending, RunStatus::Cancelled)
            | (RunStatus::Running, RunStatus::Completed)
            | (RunStatus::Running, RunStatus::Failed)
            | (RunStatus::Running, RunStatus::Cancelled) => true,
            (current, next) => *current == next && !current.is_terminal(),
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RunStatus::Pending => write!(f, "pending"),
            RunStatus::Running => write!(f, "running"),
            RunStatus::Completed => write!(f, "completed"),
            RunStatus::Failed => write!(f, "failed"),
            RunStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl FromStr for RunStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(RunStatus::Pending),
            "running" => Ok(RunStatus::Running),
            "completed" => Ok(RunStatus::Completed),
            "failed" => Ok(RunStatus::Failed),
            "cancelled" => Ok(RunStatus::Cancelled),
            _ => Err(()),
        }
    }
}

/// 工作流步骤
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepName {
    Discover,
    Scrape,
    Aggregate,
    Analyze,
}

impl StepName {
    /// 按执行顺序排列的步骤
    pub const ORDERED: [StepName; 4] = [
        StepName::Discover,
        StepName::Scrape,
        StepName::Aggregate,
        StepName::Analyze,
    ];

    pub fn ordinal(&self) -> i32 {
        match self {
            StepName::Discover => 0,
            StepName::Scrape => 1,
            StepName::Aggregate => 2,
            StepName::Analyze => 3,
        }
    }

    /// 下一个步骤，最后一步返回 `None`
    pub fn next(&self) -> Option<StepName> {
        StepName::ORDERED.get(self.ordinal() as usize + 1).copied()
    }

    /// 进度标签
    pub fn progress_label(&self) -> &'static str {
        match self {
            StepName::Discover => "discovering",
            StepName::Scrape => "scraping",
            StepName::Aggregate => "aggregating",
            StepName::Analyze => "analyzing",
        }
    }
}

impl fmt::Display for StepName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            StepName::Discover => write!(f, "discover"),
            StepName::Scrape => write!(f, "scrape"),
            StepName::Aggregate => write!(f, "aggregate"),
            StepName::Analyze => write!(f, "analyze"),
        }
    }
}

impl FromStr for StepName {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "discover" => Ok(StepName::Discover),
            "scrape" => Ok(StepName::Scrape),
            "aggregate" => Ok(StepName::Aggregate),
            "analyze" => Ok(StepName::Analyze),
            _ => Err(()),
        }
    }
}

/// 步骤状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    #[default]
    Pending,
    Running,
    Completed,
    Failed,
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            StepStatus::Pending => write!(f, "pending"),
            StepStatus::Running => write!(f, "running"),
            StepStatus::Completed => write!(f, "completed"),
            StepStatus::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for StepStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(StepStatus::Pending),
            "running" => Ok(StepStatus::Running),
            "completed" => Ok(StepStatus::Completed),
            "failed" => Ok(StepStatus::Failed),
            _ => Err(()),
        }
    }
}

/// 步骤执行记录
///
/// 已完成步骤的 `output` 会在恢复执行时直接复用
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    pub name: StepName,
    pub status: StepStatus,
    pub ordinal: i32,
    /// 步骤输出（JSON）
    pub output: Option<serde_json::Value>,
    pub error: Option<String>,
    /// 已尝试次数
    pub attempts: u32,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl StepRecord {
    pub fn new(name: StepName) -> Self {
        Self {
            name,
            status: StepStatus::Pending,
            ordinal: name.ordinal(),
            output: None,
            error: None,
            attempts: 0,
            started_at: None,
            completed_at: None,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == StepStatus::Completed && self.output.is_some()
    }
}

/// 运行的终态结果
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlOutcome {
    pub success: bool,
    /// 失败所在的步骤
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_stage: Option<StepName>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub pages_discovered: usize,
    pub pages_scraped: usize,
    pub pages_analyzed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<SeoAnalysisResult>,
}

/// 工作流运行实体
///
/// 一次SEO爬取请求对应的持久化执行记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowRun {
    /// 运行唯一标识符
    pub id: Uuid,
    /// 发起请求的调用方
    pub caller_id: String,
    /// 结果归属的客户
    pub client_id: String,
    /// 规范化后的根URL
    pub root_url: String,
    pub provider: ProviderKind,
    /// 页面上限
    pub max_pages: usize,
    pub status: RunStatus,
    /// 按顺序排列的步骤记录
    pub steps: Vec<StepRecord>,
    pub result: Option<CrawlOutcome>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl WorkflowRun {
    pub fn new(
        caller_id: impl Into<String>,
        client_id: impl Into<String>,
        root_url: impl Into<String>,
        provider: ProviderKind,
        max_pages: usize,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            caller_id: caller_id.into(),
            client_id: client_id.into(),
            root_url: root_url.into(),
            provider,
            max_pages,
            status: RunStatus::Pending,
            steps: Vec::new(),
            result: None,
            error: None,
            created_at: now,
            updated_at: now,
            started_at: None,
            completed_at: None,
        }
    }

    fn transition(&mut self, next: RunStatus) -> Result<(), DomainError> {
        if !self.status.can_transition_to(next) {
            return Err(DomainError::InvalidStateTransition {
                from: self.status,
                to: next,
            });
        }
        let now = Utc::now();
        self.status = next;
        self.updated_at = now;
        if next.is_terminal() {
            self.completed_at = Some(now);
        }
        Ok(())
    }

    /// 开始运行，恢复执行时已处于 Running 也视为成功
    ///
    /// 仅在运行首次开始时返回 `true`
    pub fn start(&mut self) -> Result<bool, DomainError> {
        if self.status == RunStatus::Running {
            return Ok(false);
        }
        self.transition(RunStatus::Running)?;
        let first_start = self.started_at.is_none();
        if first_start {
            self.started_at = Some(self.updated_at);
        }
        Ok(first_start)
    }

    pub fn complete(&mut self, outcome: CrawlOutcome) -> Result<(), DomainError> {
        self.transition(RunStatus::Completed)?;
        self.result = Some(outcome);
        Ok(())
    }

    pub fn fail(&mut self, outcome: CrawlOutcome) -> Result<(), DomainError> {
        self.transition(RunStatus::Failed)?;
        self.error = outcome.error.clone();
        self.result = Some(outcome);
        Ok(())
    }

    pub fn cancel(&mut self) -> Result<(), DomainError> {
        self.transition(RunStatus::Cancelled)?;
        self.error = Some("Run cancelled".to_string());
        Ok(())
    }

    pub fn step(&self, name: StepName) -> Option<&StepRecord> {
        self.steps.iter().find(|s| s.name == name)
    }

    /// 获取或创建步骤记录
    pub fn step_mut(&mut self, name: StepName) -> &mut StepRecord {
        let index = match self.steps.iter().position(|s| s.name == name) {
            Some(index) => index,
            None => {
                self.steps.push(StepRecord::new(name));
                self.steps.sort_by_key(|s| s.ordinal);
                self.steps
                    .iter()
                    .position(|s| s.name == name)
                    .unwrap_or(self.steps.len() - 1)
            }
        };
        &mut self.steps[index]
    }

    /// 已完成步骤的持久化输出
    pub fn completed_output(&self, name: StepName) -> Option<&serde_json::Value> {
        self.step(name)
            .filter(|s| s.is_completed())
            .and_then(|s| s.output.as_ref())
    }
}
