// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::domain::models::workflow::WorkflowRun;
use crate::workers::workflow_worker::{WorkflowError, WorkflowWorker};

/// 工作管理器
///
/// 每个运行对应一个后台任务，任务句柄按运行ID保存
#[derive(Clone)]
pub struct WorkerManager {
    worker: Arc<WorkflowWorker>,
    handles: Arc<DashMap<Uuid, JoinHandle<()>>>,
}

impl WorkerManager {
    pub fn new(worker: Arc<WorkflowWorker>) -> Self {
        Self {
            worker,
            handles: Arc::new(DashMap::new()),
        }
    }

    /// 在后台执行运行，同一运行不会被重复调度
    pub fn spawn_run(&self, run_id: Uuid) {
        if let Some(handle) = self.handles.get(&run_id) {
            if !handle.is_finished() {
                warn!("Run {} is already executing", run_id);
                return;
            }
        }

        let worker = self.worker.clone();
        let handles = self.handles.clone();
        let (registered_tx, registered_rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            // The handle must be in the map before the task can remove it
            if registered_rx.await.is_err() {
                return;
            }
            match worker.execute(run_id).await {
                Ok(run) => info!("Run {} finished with status {}", run_id, run.status),
                Err(e) => error!("Run {} stopped before finishing: {}", run_id, e),
            }
            handles.remove(&run_id);
        });
        self.handles.insert(run_id, handle);
        let _ = registered_tx.send(());
    }

    /// 恢复存储中所有未完成的运行
    ///
    /// # 返回值
    ///
    /// 返回重新调度的运行数量
    pub async fn resume_unfinished(&self) -> Result<usize, WorkflowError> {
        let runs = self.worker.runs().find_unfinished().await?;
        let count = runs.len();
        for run in runs {
            info!("Resuming run {} ({})", run.id, run.status);
            self.spawn_run(run.id);
        }
        Ok(count)
    }

    pub fn is_running(&self, run_id: Uuid) -> bool {
        self.handles
            .get(&run_id)
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    /// 持有后台任务的运行数量，任务结束后自动移除
    pub fn active_runs(&self) -> usize {
        self.handles.len()
    }

    /// 取消运行：中止后台任务并将运行标记为已取消
    ///
    /// 已到达终态的运行保持不变
    pub async fn cancel_run(&self, run_id: Uuid) -> Result<WorkflowRun, WorkflowError> {
        if let Some((_, handle)) = self.handles.remove(&run_id) {
            handle.abort();
        }

        let runs = self.worker.runs();
        let mut run = runs
            .find_by_id(run_id)
            .await?
            .ok_or(WorkflowError::RunNotFound(run_id))?;

        if run.status.is_terminal() {
            return Ok(run);
        }

        run.cancel()?;
        runs.update_run(&run).await?;
        info!("Run {} cancelled", run_id);
        Ok(run)
    }

    /// 中止所有后台任务，运行保持可恢复状态
    pub fn shutdown(&self) {
        info!("Shutting down workers...");
        for entry in self.handles.iter() {
            entry.value().abort();
        }
        self.handles.clear();
        info!("Workers shut down successfully");
    }

    /// 等待关闭信号并关闭工作进程
    pub async fn wait_for_shutdown(&self) {
        match signal::ctrl_c().await {
            Ok(()) => info!("Shutdown signal received"),
            Err(err) => error!("Unable to listen for shutdown signal: {}", err),
        }
        self.shutdown();
    }
}
