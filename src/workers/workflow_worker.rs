// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::config::settings::Settings;
use crate::domain::models::discovery::{DiscoveryResult, DiscoveryStrategy};
use crate::domain::models::page::{AggregatedContent, PageContent};
use crate::domain::models::seo::{SeoAnalysisResult, SeoSettings};
use crate::domain::models::workflow::{
    CrawlOutcome, DomainError, ProviderKind, StepName, StepStatus, WorkflowRun,
};
use crate::domain::repositories::seo_settings_repository::SeoSettingsRepository;
use crate::domain::repositories::workflow_run_repository::{
    RepositoryError, WorkflowRunRepository,
};
use crate::domain::services::aggregation_service::aggregate;
use crate::domain::services::analysis_service::AnalysisService;
use crate::domain::services::discovery_service::DiscoveryService;
use crate::engines::factory::ProviderFactory;
use crate::engines::traits::{BatchRequest, BatchSummary};
use crate::infrastructure::metrics;
use crate::utils::retry_policy::RetryPolicy;

/// 步骤错误
///
/// `Fatal` 立即终止运行，`Retryable` 按重试策略重新执行该步骤
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StepError {
    #[error("{0}")]
    Fatal(String),
    #[error("{0}")]
    Retryable(String),
}

impl StepError {
    pub fn message(&self) -> &str {
        match self {
            StepError::Fatal(m) | StepError::Retryable(m) => m,
        }
    }
}

/// 工作流执行错误
///
/// 只包含基础设施错误，步骤失败会记录到运行结果中
#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("Run not found: {0}")]
    RunNotFound(Uuid),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Domain(#[from] DomainError),
}

/// 抓取步骤输出
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeStepOutput {
    pub success: bool,
    /// 抓取成功的页面，保持优先级顺序
    pub pages: Vec<PageContent>,
    pub summary: BatchSummary,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// 聚合步骤输出
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateStepOutput {
    pub success: bool,
    pub content: AggregatedContent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

enum Halt {
    Step(String),
    Infra(WorkflowError),
}

impl From<RepositoryError> for Halt {
    fn from(err: RepositoryError) -> Self {
        Halt::Infra(err.into())
    }
}

/// 工作流执行器
///
/// 按顺序执行发现、抓取、聚合、分析四个步骤，每个步骤的状态和输出都会持久化。
/// 已完成的步骤在恢复执行时直接复用存储的输出
pub struct WorkflowWorker {
    runs: Arc<dyn WorkflowRunRepository>,
    seo_settings: Arc<dyn SeoSettingsRepository>,
    discovery: DiscoveryService,
    providers: ProviderFactory,
    analysis: Arc<AnalysisService>,
    retry_policy: RetryPolicy,
    max_aggregated_chars: usize,
    max_duration: Duration,
}

impl WorkflowWorker {
    pub fn new(
        runs: Arc<dyn WorkflowRunRepository>,
        seo_settings: Arc<dyn SeoSettingsRepository>,
        discovery: DiscoveryService,
        providers: ProviderFactory,
        analysis: Arc<AnalysisService>,
        settings: &Settings,
    ) -> Self {
        Self {
            runs,
            seo_settings,
            discovery,
            providers,
            analysis,
            retry_policy: RetryPolicy::for_steps(&settings.workflow),
            max_aggregated_chars: settings.crawl.max_aggregated_chars,
            max_duration: settings.workflow.max_duration(),
        }
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    pub fn with_max_duration(mut self, max_duration: Duration) -> Self {
        self.max_duration = max_duration;
        self
    }

    pub fn runs(&self) -> Arc<dyn WorkflowRunRepository> {
        self.runs.clone()
    }

    /// 执行或恢复一次运行
    ///
    /// # 返回值
    ///
    /// * `Ok(WorkflowRun)` - 运行已到达终态（成功或失败）
    /// * `Err(WorkflowError)` - 存储不可用等基础设施错误，运行保持可恢复状态
    #[instrument(skip(self), fields(run_id = %run_id))]
    pub async fn execute(&self, run_id: Uuid) -> Result<WorkflowRun, WorkflowError> {
        let mut run = self
            .runs
            .find_by_id(run_id)
            .await?
            .ok_or(WorkflowError::RunNotFound(run_id))?;

        if run.status.is_terminal() {
            info!("Run already finished with status {}", run.status);
            return Ok(run);
        }

        let resumed = !run.steps.is_empty();
        let first_start = run.start()?;
        self.runs.update_run(&run).await?;
        if first_start {
            metrics::record_run_started();
        }
        info!(
            "Executing run for {} via {} (resumed: {})",
            run.root_url, run.provider, resumed
        );

        let started = Instant::now();
        let result = tokio::time::timeout(self.max_duration, self.run_steps(&mut run)).await;
        let outcome = match result {
            Ok(result) => result?,
            Err(_) => self.timed_out(&mut run).await?,
        };

        let elapsed = started.elapsed();
        if outcome.success {
            info!("Run completed in {:?}", elapsed);
            metrics::record_run_completed(elapsed);
            run.complete(outcome)?;
        } else {
            warn!(
                "Run failed at {:?}: {}",
                outcome.failed_stage,
                outcome.error.as_deref().unwrap_or("unknown error")
            );
            metrics::record_run_failed(outcome.failed_stage, elapsed);
            run.fail(outcome)?;
        }

        self.runs.update_run(&run).await?;
        Ok(run)
    }

    async fn run_steps(&self, run: &mut WorkflowRun) -> Result<CrawlOutcome, WorkflowError> {
        let root_url = run.root_url.clone();
        let kind = run.provider;
        let max_pages = run.max_pages;

        let discovered: DiscoveryResult = match self
            .run_step(run, StepName::Discover, || {
                self.discover_step(kind, &root_url, max_pages)
            })
            .await
        {
            Ok(output) => output,
            Err(halt) => return self.halted(run, StepName::Discover, halt),
        };

        let urls = discovered.urls.clone();
        let scraped: ScrapeStepOutput = match self
            .run_step(run, StepName::Scrape, || {
                self.scrape_step(kind, &root_url, &urls, max_pages)
            })
            .await
        {
            Ok(output) => output,
            Err(halt) => return self.halted(run, StepName::Scrape, halt),
        };
        if !scraped.success {
            let message = scraped
                .error
                .clone()
                .unwrap_or_else(|| "All pages failed to scrape".to_string());
            return Ok(failure_outcome(run, StepName::Scrape, message));
        }

        let pages = scraped.pages.clone();
        let aggregated: AggregateStepOutput = match self
            .run_step(run, StepName::Aggregate, || self.aggregate_step(&pages))
            .await
        {
            Ok(output) => output,
            Err(halt) => return self.halted(run, StepName::Aggregate, halt),
        };
        if !aggregated.success {
            let message = aggregated
                .error
                .clone()
                .unwrap_or_else(|| "No content to analyze".to_string());
            return Ok(failure_outcome(run, StepName::Aggregate, message));
        }

        let client_id = run.client_id.clone();
        let text = aggregated.content.text.clone();
        let analysis: SeoAnalysisResult = match self
            .run_step(run, StepName::Analyze, || {
                self.analyze_step(&client_id, &root_url, &text)
            })
            .await
        {
            Ok(output) => output,
            Err(halt) => return self.halted(run, StepName::Analyze, halt),
        };

        let (pages_discovered, pages_scraped, pages_analyzed) = progress_counts(run);
        Ok(CrawlOutcome {
            success: true,
            failed_stage: None,
            error: None,
            pages_discovered,
            pages_scraped,
            pages_analyzed,
            analysis: Some(analysis),
        })
    }

    /// 执行单个步骤
    ///
    /// 已完成的步骤直接返回存储的输出；可重试错误按策略退避后重新执行
    async fn run_step<T, F, Fut>(
        &self,
        run: &mut WorkflowRun,
        name: StepName,
        handler: F,
    ) -> Result<T, Halt>
    where
        T: Serialize + DeserializeOwned,
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, StepError>>,
    {
        if let Some(output) = run.completed_output(name) {
            match serde_json::from_value::<T>(output.clone()) {
                Ok(value) => {
                    info!(step = %name, "Reusing stored step output");
                    return Ok(value);
                }
                Err(e) => warn!(step = %name, "Stored step output is unreadable, re-running: {}", e),
            }
        }

        let mut retries = 0u32;
        loop {
            {
                let step = run.step_mut(name);
                step.status = StepStatus::Running;
                step.attempts += 1;
                step.output = None;
                step.error = None;
                step.started_at = Some(Utc::now());
                step.completed_at = None;
            }
            self.persist_step(run, name).await?;

            let result = handler().await.and_then(|value| {
                serde_json::to_value(&value)
                    .map(|json| (value, json))
                    .map_err(|e| StepError::Fatal(format!("Could not store step output: {}", e)))
            });

            match result {
                Ok((value, json)) => {
                    let step = run.step_mut(name);
                    step.status = StepStatus::Completed;
                    step.output = Some(json);
                    step.completed_at = Some(Utc::now());
                    self.persist_step(run, name).await?;
                    return Ok(value);
                }
                Err(StepError::Retryable(message)) if self.retry_policy.should_retry(retries) => {
                    retries += 1;
                    let backoff = self.retry_policy.calculate_backoff(retries);
                    warn!(
                        step = %name,
                        "Retryable step error (retry {}/{} in {:?}): {}",
                        retries, self.retry_policy.max_retries, backoff, message
                    );
                    run.step_mut(name).error = Some(message);
                    self.persist_step(run, name).await?;
                    tokio::time::sleep(backoff).await;
                }
                Err(err) => {
                    let message = err.message().to_string();
                    error!(step = %name, "Step failed: {}", message);
                    let step = run.step_mut(name);
                    step.status = StepStatus::Failed;
                    step.error = Some(message.clone());
                    step.completed_at = Some(Utc::now());
                    self.persist_step(run, name).await?;
                    return Err(Halt::Step(message));
                }
            }
        }
    }

    async fn persist_step(&self, run: &WorkflowRun, name: StepName) -> Result<(), RepositoryError> {
        match run.step(name) {
            Some(step) => self.runs.upsert_step(run.id, step).await,
            None => Ok(()),
        }
    }

    fn halted(
        &self,
        run: &WorkflowRun,
        stage: StepName,
        halt: Halt,
    ) -> Result<CrawlOutcome, WorkflowError> {
        match halt {
            Halt::Step(message) => Ok(failure_outcome(run, stage, message)),
            Halt::Infra(err) => Err(err),
        }
    }

    async fn timed_out(&self, run: &mut WorkflowRun) -> Result<CrawlOutcome, WorkflowError> {
        let message = format!(
            "Run exceeded maximum duration of {}s",
            self.max_duration.as_secs()
        );

        let stage = run
            .steps
            .iter()
            .find(|s| s.status == StepStatus::Running)
            .map(|s| s.name);
        if let Some(name) = stage {
            let step = run.step_mut(name);
            step.status = StepStatus::Failed;
            step.error = Some(message.clone());
            step.completed_at = Some(Utc::now());
            self.persist_step(run, name).await?;
        }

        let (pages_discovered, pages_scraped, pages_analyzed) = progress_counts(run);
        Ok(CrawlOutcome {
            success: false,
            failed_stage: stage,
            error: Some(message),
            pages_discovered,
            pages_scraped,
            pages_analyzed,
            analysis: None,
        })
    }

    async fn discover_step(
        &self,
        kind: ProviderKind,
        root_url: &str,
        max_pages: usize,
    ) -> Result<DiscoveryResult, StepError> {
        let provider = self
            .providers
            .get(kind)
            .map_err(|e| StepError::Fatal(e.to_string()))?;

        if provider.native_crawl() {
            info!("Provider {} crawls natively, skipping discovery", provider.name());
            return Ok(DiscoveryResult::pass_through(root_url));
        }

        self.discovery
            .discover(root_url, max_pages)
            .await
            .map_err(|e| StepError::Fatal(e.to_string()))
    }

    async fn scrape_step(
        &self,
        kind: ProviderKind,
        root_url: &str,
        urls: &[String],
        max_pages: usize,
    ) -> Result<ScrapeStepOutput, StepError> {
        let provider = self
            .providers
            .get(kind)
            .map_err(|e| StepError::Fatal(e.to_string()))?;

        let request = BatchRequest {
            root_url: root_url.to_string(),
            urls: urls.to_vec(),
            max_pages,
        };

        let batch = match provider.scrape_many(&request).await {
            Ok(batch) => batch,
            Err(e) if e.is_retryable() => return Err(StepError::Retryable(e.to_string())),
            Err(e) => {
                return Ok(ScrapeStepOutput {
                    success: false,
                    pages: Vec::new(),
                    summary: BatchSummary::default(),
                    error: Some(format!("Scraping failed: {}", e)),
                })
            }
        };

        metrics::record_pages(batch.summary.total_scraped, batch.summary.total_failed);
        info!(
            "Scraped {} pages ({} failed) with {}",
            batch.summary.total_scraped,
            batch.summary.total_failed,
            provider.name()
        );

        let success = !batch.summary.is_failure();
        let pages = batch
            .pages
            .into_iter()
            .filter(|p| p.success)
            .filter_map(|p| p.content.map(|content| PageContent::new(p.url, content)))
            .collect();

        Ok(ScrapeStepOutput {
            success,
            pages,
            summary: batch.summary,
            error: (!success).then(|| {
                format!(
                    "All pages failed to scrape ({} attempted)",
                    batch.summary.total_scraped + batch.summary.total_failed
                )
            }),
        })
    }

    async fn aggregate_step(&self, pages: &[PageContent]) -> Result<AggregateStepOutput, StepError> {
        let content = aggregate(pages, self.max_aggregated_chars);
        let success = !content.is_empty();
        info!(
            "Aggregated {} pages into {} chars ({} excluded)",
            content.included_urls.len(),
            content.total_chars,
            content.excluded_urls.len()
        );

        Ok(AggregateStepOutput {
            success,
            error: (!success).then(|| "No page content fit within the crawl budget".to_string()),
            content,
        })
    }

    async fn analyze_step(
        &self,
        client_id: &str,
        root_url: &str,
        text: &str,
    ) -> Result<SeoAnalysisResult, StepError> {
        let analysis = self.analysis.analyze(text).await.map_err(|e| {
            if e.is_retryable() {
                StepError::Retryable(e.to_string())
            } else {
                StepError::Fatal(e.to_string())
            }
        })?;

        let settings = SeoSettings::from_analysis(client_id, root_url, &analysis);
        self.seo_settings
            .upsert(&settings)
            .await
            .map_err(|e| StepError::Retryable(format!("Could not save SEO settings: {}", e)))?;
        info!("Saved SEO settings for client {}", client_id);

        Ok(analysis)
    }
}

fn step_output<T: DeserializeOwned>(run: &WorkflowRun, name: StepName) -> Option<T> {
    run.completed_output(name)
        .and_then(|value| serde_json::from_value(value.clone()).ok())
}

/// 从已完成步骤的输出中统计进度
fn progress_counts(run: &WorkflowRun) -> (usize, usize, usize) {
    let discovered = step_output::<DiscoveryResult>(run, StepName::Discover);
    let scraped = step_output::<ScrapeStepOutput>(run, StepName::Scrape);

    let pages_discovered = match (&discovered, &scraped) {
        // Native crawls discover pages during the scrape step
        (Some(d), Some(s))
            if d.strategy == DiscoveryStrategy::None
                && s.summary.total_scraped + s.summary.total_failed > 0 =>
        {
            s.summary.total_scraped + s.summary.total_failed
        }
        (Some(d), _) => d.count(),
        (None, _) => 0,
    };
    let pages_scraped = scraped.map(|s| s.summary.total_scraped).unwrap_or(0);
    let pages_analyzed = if run.completed_output(StepName::Analyze).is_some() {
        step_output::<AggregateStepOutput>(run, StepName::Aggregate)
            .map(|a| a.content.included_urls.len())
            .unwrap_or(0)
    } else {
        0
    };

    (pages_discovered, pages_scraped, pages_analyzed)
}

fn failure_outcome(run: &WorkflowRun, stage: StepName, message: String) -> CrawlOutcome {
    let (pages_discovered, pages_scraped, pages_analyzed) = progress_counts(run);
    CrawlOutcome {
        success: false,
        failed_stage: Some(stage),
        error: Some(message),
        pages_discovered,
        pages_scraped,
        pages_analyzed,
        analysis: None,
    }
}
