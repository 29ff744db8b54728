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
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::settings::{CrawlSettings, FirecrawlSettings};
use crate::engines::traits::{
    BatchOutcome, BatchRequest, ProviderError, ProviderKind, ScrapeOutcome, ScrapeProvider,
};

#[derive(Debug, Deserialize)]
struct ScrapeResponseBody {
    #[serde(default)]
    success: bool,
    data: Option<Document>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Document {
    markdown: Option<String>,
    metadata: Option<DocumentMetadata>,
}

#[derive(Debug, Deserialize)]
struct DocumentMetadata {
    #[serde(rename = "sourceURL")]
    source_url: Option<String>,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CrawlResponseBody {
    success: Option<bool>,
    id: Option<String>,
    status: Option<String>,
    data: Option<Vec<Document>>,
    error: Option<String>,
}

/// 全站爬取引擎
///
/// 单页使用 `POST {base}/scrape`，批量时提交一次 `POST {base}/crawl`，
/// 由提供方自行发现页面；返回作业ID时轮询 `GET {base}/crawl/{id}` 直到完成
pub struct FirecrawlEngine {
    client: reqwest::Client,
    base_url: String,
    poll_interval: Duration,
    crawl_timeout: Duration,
}

impl FirecrawlEngine {
    pub fn new(
        firecrawl: &FirecrawlSettings,
        crawl: &CrawlSettings,
    ) -> Result<Self, ProviderError> {
        let mut headers = HeaderMap::new();
        if let Some(key) = firecrawl.api_key.as_deref().filter(|k| !k.is_empty()) {
            let value = HeaderValue::from_str(&format!("Bearer {}", key)).map_err(|e| {
                ProviderError::NotConfigured(format!("Invalid firecrawl API key: {}", e))
            })?;
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .user_agent(crawl.user_agent.as_str())
            .default_headers(headers)
            .timeout(crawl.page_timeout().max(Duration::from_secs(30)))
            .build()?;

        Ok(Self {
            client,
            base_url: firecrawl.base_url.trim_end_matches('/').to_string(),
            poll_interval: Duration::from_millis(firecrawl.poll_interval_ms.max(1)),
            crawl_timeout: Duration::from_secs(firecrawl.timeout_secs),
        })
    }

    fn document_to_outcome(document: Document, fallback_url: &str) -> ScrapeOutcome {
        let url = document
            .metadata
            .as_ref()
            .and_then(|m| m.source_url.clone().or_else(|| m.url.clone()))
            .unwrap_or_else(|| fallback_url.to_string());

        match document.markdown {
            Some(markdown) if !markdown.trim().is_empty() => ScrapeOutcome::ok(url, markdown),
            _ => ScrapeOutcome::failed(url, ProviderError::EmptyContent.to_string()),
        }
    }

    async fn send_json<T: for<'de> Deserialize<'de>>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ProviderError> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Firecrawl returned HTTP {}: {}", status, body);
            return Err(ProviderError::HttpStatus(status.as_u16()));
        }
        response
            .json::<T>()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))
    }

    /// 轮询爬取作业直到完成
    async fn wait_for_crawl(&self, job_id: &str) -> Result<Vec<Document>, ProviderError> {
        let deadline = Instant::now() + self.crawl_timeout;
        let status_url = format!("{}/crawl/{}", self.base_url, job_id);

        loop {
            let body: CrawlResponseBody = self.send_json(self.client.get(&status_url)).await?;
            let status = body.status.as_deref().unwrap_or("scraping");
            debug!("Crawl job {} status: {}", job_id, status);

            match status {
                "completed" => return Ok(body.data.unwrap_or_default()),
                "failed" | "cancelled" => {
                    return Err(ProviderError::Other(format!(
                        "Crawl job {} {}: {}",
                        job_id,
                        status,
                        body.error.unwrap_or_default()
                    )))
                }
                _ => {}
            }

            if Instant::now() + self.poll_interval > deadline {
                return Err(ProviderError::Timeout);
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

#[async_trait]
impl ScrapeProvider for FirecrawlEngine {
    async fn fetch(&self, url: &str) -> Result<String, ProviderError> {
        let request = self
            .client
            .post(format!("{}/scrape", self.base_url))
            .json(&json!({ "url": url, "formats": ["markdown"] }));

        let body: ScrapeResponseBody = self.send_json(request).await?;
        if !body.success {
            return Err(ProviderError::InvalidResponse(
                body.error.unwrap_or_else(|| "scrape was not successful".to_string()),
            ));
        }

        body.data
            .and_then(|d| d.markdown)
            .filter(|m| !m.trim().is_empty())
            .ok_or(ProviderError::EmptyContent)
    }

    async fn scrape_many(&self, request: &BatchRequest) -> Result<BatchOutcome, ProviderError> {
        let crawl_request = self
            .client
            .post(format!("{}/crawl", self.base_url))
            .json(&json!({
                "url": request.root_url,
                "limit": request.max_pages,
                "scrapeOptions": { "formats": ["markdown"] },
            }));

        let body: CrawlResponseBody = self.send_json(crawl_request).await?;
        if body.success == Some(false) {
            return Err(ProviderError::InvalidResponse(
                body.error.unwrap_or_else(|| "crawl was not accepted".to_string()),
            ));
        }

        let documents = match (body.data, body.id) {
            (Some(data), _) if !data.is_empty() => data,
            (_, Some(job_id)) => {
                info!("Firecrawl crawl job {} started for {}", job_id, request.root_url);
                self.wait_for_crawl(&job_id).await?
            }
            (data, None) => data.unwrap_or_default(),
        };

        let pages: Vec<ScrapeOutcome> = documents
            .into_iter()
            .take(request.max_pages)
            .map(|d| Self::document_to_outcome(d, &request.root_url))
            .collect();

        let outcome = BatchOutcome::new(pages);
        info!(
            "Firecrawl crawl finished: {} scraped, {} failed",
            outcome.summary.total_scraped, outcome.summary.total_failed
        );
        Ok(outcome)
    }

    fn native_crawl(&self) -> bool {
        true
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Firecrawl
    }

    fn name(&self) -> &'static str {
        "firecrawl"
    }
}
