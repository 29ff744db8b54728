// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 工作器模块
///
/// 工作流执行器（workflow_worker）负责单次运行的步骤编排，
/// 工作管理器（manager）负责后台任务的调度、恢复与取消
pub mod manager;
pub mod workflow_worker;

pub use manager::WorkerManager;
pub use workflow_worker::WorkflowWorker;
