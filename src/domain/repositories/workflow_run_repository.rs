// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use sea_orm::DbErr;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::models::workflow::{RunStatus, StepRecord, WorkflowRun};

/// 仓库错误类型
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// 数据库错误
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
    /// 记录未找到
    #[error("Record not found")]
    NotFound,
    /// 非法的状态变更，例如终态运行被改回运行中
    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition { from: RunStatus, to: RunStatus },
    /// 存储的JSON或枚举值无法解析
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// 工作流运行仓库特质
///
/// 运行记录及其有序步骤日志的持久化接口
#[async_trait]
pub trait WorkflowRunRepository: Send + Sync {
    /// 创建运行记录
    async fn create(&self, run: &WorkflowRun) -> Result<WorkflowRun, RepositoryError>;

    /// 根据ID查找运行，包含全部步骤记录
    ///
    /// # 返回值
    ///
    /// * `Ok(Some(WorkflowRun))` - 找到运行
    /// * `Ok(None)` - 运行不存在
    async fn find_by_id(&self, id: Uuid) -> Result<Option<WorkflowRun>, RepositoryError>;

    /// 更新运行的状态和结果字段
    ///
    /// 已处于终态的运行不能变更为其他状态，返回 `InvalidTransition`
    async fn update_run(&self, run: &WorkflowRun) -> Result<WorkflowRun, RepositoryError>;

    /// 插入或更新单个步骤记录
    async fn upsert_step(&self, run_id: Uuid, step: &StepRecord) -> Result<(), RepositoryError>;

    /// 查找所有未到达终态的运行，用于启动时恢复
    async fn find_unfinished(&self) -> Result<Vec<WorkflowRun>, RepositoryError>;
}
