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
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use std::time::Duration;
use tracing::{debug, info};

use crate::config::settings::{CrawlSettings, ReaderSettings};
use crate::engines::batch::scrape_concurrently;
use crate::engines::traits::{
    BatchOutcome, BatchRequest, ProviderError, ProviderKind, ScrapeProvider,
};

/// 阅读代理抓取引擎
///
/// 请求 `{base_url}/{page_url}`，代理返回页面的纯文本/Markdown内容。
/// 没有多页爬取能力，批量抓取时逐页并发请求
pub struct ReaderEngine {
    client: reqwest::Client,
    base_url: String,
    concurrency: usize,
    page_timeout: Duration,
}

impl ReaderEngine {
    /// 创建新的阅读代理引擎
    ///
    /// # 参数
    ///
    /// * `reader` - 代理配置
    /// * `crawl` - 爬取配置（并发数、超时、User-Agent）
    pub fn new(reader: &ReaderSettings, crawl: &CrawlSettings) -> Result<Self, ProviderError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("text/plain"));
        if let Some(key) = reader.api_key.as_deref().filter(|k| !k.is_empty()) {
            let value = HeaderValue::from_str(&format!("Bearer {}", key))
                .map_err(|e| ProviderError::NotConfigured(format!("Invalid reader API key: {}", e)))?;
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .user_agent(crawl.user_agent.as_str())
            .default_headers(headers)
            .timeout(crawl.page_timeout())
            .build()?;

        Ok(Self {
            client,
            base_url: reader.base_url.trim_end_matches('/').to_string(),
            concurrency: crawl.scrape_concurrency,
            page_timeout: crawl.page_timeout(),
        })
    }

    fn proxy_url(&self, page_url: &str) -> String {
        format!("{}/{}", self.base_url, page_url)
    }
}

#[async_trait]
impl ScrapeProvider for ReaderEngine {
    async fn fetch(&self, url: &str) -> Result<String, ProviderError> {
        let response = self.client.get(self.proxy_url(url)).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::HttpStatus(status.as_u16()));
        }

        let content = response.text().await?;
        if content.trim().is_empty() {
            return Err(ProviderError::EmptyContent);
        }

        debug!("Reader returned {} chars for {}", content.len(), url);
        Ok(content)
    }

    async fn scrape_many(&self, request: &BatchRequest) -> Result<BatchOutcome, ProviderError> {
        let urls: Vec<String> = request.urls.iter().take(request.max_pages).cloned().collect();

        let pages = scrape_concurrently(&urls, self.concurrency, self.page_timeout, |url| async move {
            self.fetch(&url).await
        })
        .await;

        let outcome = BatchOutcome::new(pages);
        info!(
            "Reader batch finished: {} scraped, {} failed",
            outcome.summary.total_scraped, outcome.summary.total_failed
        );
        Ok(outcome)
    }

    fn native_crawl(&self) -> bool {
        false
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Reader
    }

    fn name(&self) -> &'static str {
        "reader"
    }
}

#[cfg(test)]
#[path = "reader_engine_test.rs"]
mod tests;
