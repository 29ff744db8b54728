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
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use crate::domain::models::workflow::ProviderKind;

/// 抓取提供方错误类型
#[derive(Error, Debug)]
pub enum ProviderError {
    /// 请求失败
    #[error("Request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
    /// 非成功的HTTP状态码
    #[error("Provider returned HTTP {0}")]
    HttpStatus(u16),
    /// 超时
    #[error("Timeout")]
    Timeout,
    /// 返回内容为空
    #[error("Empty content")]
    EmptyContent,
    /// 响应格式不符合约定
    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),
    /// 提供方未配置
    #[error("Provider not configured: {0}")]
    NotConfigured(String),
    /// 其他错误
    #[error("Other error: {0}")]
    Other(String),
}

impl ProviderError {
    /// 判断错误是否可重试
    ///
    /// # 返回值
    ///
    /// 如果错误是可重试的则返回true，否则返回false
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::RequestFailed(e) => {
                e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error())
            }
            ProviderError::HttpStatus(code) => *code == 429 || *code >= 500,
            ProviderError::Timeout => true,
            _ => false,
        }
    }
}

/// 单页抓取结果
///
/// 单页失败不会中断批量抓取，失败原因记录在 `error` 中
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapeOutcome {
    pub url: String,
    pub success: bool,
    pub content: Option<String>,
    pub error: Option<String>,
}

impl ScrapeOutcome {
    pub fn ok(url: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            success: true,
            content: Some(content.into()),
            error: None,
        }
    }

    pub fn failed(url: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            success: false,
            content: None,
            error: Some(error.into()),
        }
    }
}

/// 批量抓取请求
#[derive(Debug, Clone)]
pub struct BatchRequest {
    /// 站点根URL
    pub root_url: String,
    /// 按优先级排序的待抓取URL
    pub urls: Vec<String>,
    /// 页面上限
    pub max_pages: usize,
}

/// 批量抓取统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub total_scraped: usize,
    pub total_failed: usize,
}

impl BatchSummary {
    pub fn from_outcomes(outcomes: &[ScrapeOutcome]) -> Self {
        let total_scraped = outcomes.iter().filter(|o| o.success).count();
        Self {
            total_scraped,
            total_failed: outcomes.len() - total_scraped,
        }
    }

    /// 整批是否判定为失败
    ///
    /// 失败率超过一半且没有任何成功页面时才算失败，空批次也算失败
    pub fn is_failure(&self) -> bool {
        let total = self.total_scraped + self.total_failed;
        if total == 0 {
            return true;
        }
        let failure_ratio = self.total_failed as f64 / total as f64;
        failure_ratio > 0.5 && self.total_scraped == 0
    }
}

/// 批量抓取结果，`pages` 保持请求中的优先级顺序
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOutcome {
    pub pages: Vec<ScrapeOutcome>,
    pub summary: BatchSummary,
}

impl BatchOutcome {
    pub fn new(pages: Vec<ScrapeOutcome>) -> Self {
        let summary = BatchSummary::from_outcomes(&pages);
        Self { pages, summary }
    }
}

/// 抓取提供方特质
#[async_trait]
pub trait ScrapeProvider: Send + Sync {
    /// 获取单个页面的文本内容
    async fn fetch(&self, url: &str) -> Result<String, ProviderError>;

    /// 批量抓取
    ///
    /// 自带多页爬取的提供方以 `request.root_url` 为起点自行发现页面，
    /// 其他提供方逐个抓取 `request.urls`
    async fn scrape_many(&self, request: &BatchRequest) -> Result<BatchOutcome, ProviderError>;

    /// 是否自带多页爬取（为真时跳过URL发现）
    fn native_crawl(&self) -> bool;

    /// 提供方类型
    fn kind(&self) -> ProviderKind;

    /// 提供方名称
    fn name(&self) -> &'static str;

    /// 抓取单个页面，错误转为失败结果
    async fn scrape_one(&self, url: &str) -> ScrapeOutcome {
        match self.fetch(url).await {
            Ok(content) => ScrapeOutcome::ok(url, content),
            Err(e) => ScrapeOutcome::failed(url, e.to_string()),
        }
    }
}
