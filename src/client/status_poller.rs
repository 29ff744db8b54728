// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::settings::CrawlSettings;
use crate::domain::services::status_service::StatusReport;

/// 状态轮询错误
#[derive(Error, Debug)]
pub enum PollError {
    #[error("Run {0} not found")]
    UnknownRun(Uuid),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Status endpoint returned HTTP {0}")]
    HttpStatus(u16),
    #[error("Request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
    #[error("Polling cancelled")]
    Cancelled,
}

impl PollError {
    /// 是否应停止轮询
    pub fn is_final(&self) -> bool {
        matches!(
            self,
            PollError::UnknownRun(_) | PollError::Unauthorized | PollError::Cancelled
        )
    }
}

/// 运行状态轮询客户端
///
/// 按固定间隔请求 `GET /v1/crawl/{run_id}`，直到运行到达终态
#[derive(Clone)]
pub struct StatusPoller {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    interval: Duration,
}

impl StatusPoller {
    pub fn new(
        base_url: &str,
        api_key: impl Into<String>,
        interval: Duration,
    ) -> Result<Self, PollError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            interval,
        })
    }

    pub fn from_settings(
        base_url: &str,
        api_key: impl Into<String>,
        settings: &CrawlSettings,
    ) -> Result<Self, PollError> {
        Self::new(base_url, api_key, settings.poll_interval())
    }

    /// 请求一次运行状态
    pub async fn fetch_status(&self, run_id: Uuid) -> Result<StatusReport, PollError> {
        let url = format!("{}/v1/crawl/{}", self.base_url, run_id);
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(PollError::UnknownRun(run_id)),
            StatusCode::UNAUTHORIZED => Err(PollError::Unauthorized),
            status if !status.is_success() => Err(PollError::HttpStatus(status.as_u16())),
            _ => Ok(response.json::<StatusReport>().await?),
        }
    }

    /// 在后台轮询运行状态
    ///
    /// 每次获取到的报告都会发布到返回句柄的 watch 通道
    pub fn watch(&self, run_id: Uuid) -> PollHandle {
        let (sender, receiver) = watch::channel(None);
        let poller = self.clone();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(poller.interval);
            loop {
                ticker.tick().await;
                match poller.fetch_status(run_id).await {
                    Ok(report) => {
                        debug!(
                            "Run {} is {} ({})",
                            run_id,
                            report.status.as_str(),
                            report.current_step
                        );
                        let terminal = report.status.is_terminal();
                        let _ = sender.send(Some(report.clone()));
                        if terminal {
                            return Ok(report);
                        }
                    }
                    Err(e) if e.is_final() => return Err(e),
                    Err(e) => warn!("Status poll for run {} failed: {}", run_id, e),
                }
            }
        });

        PollHandle { receiver, task }
    }
}

/// 后台轮询句柄
///
/// 取消轮询只停止客户端任务，不影响服务端运行
pub struct PollHandle {
    receiver: watch::Receiver<Option<StatusReport>>,
    task: JoinHandle<Result<StatusReport, PollError>>,
}

impl PollHandle {
    pub fn subscribe(&self) -> watch::Receiver<Option<StatusReport>> {
        self.receiver.clone()
    }

    /// 最近一次获取到的报告
    pub fn latest(&self) -> Option<StatusReport> {
        self.receiver.borrow().clone()
    }

    pub fn cancel(&self) {
        self.task.abort();
    }

    /// 等待轮询结束，返回终态报告
    pub async fn wait(self) -> Result<StatusReport, PollError> {
        match self.task.await {
            Ok(result) => result,
            Err(_) => Err(PollError::Cancelled),
        }
    }
}
