// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::{
    build_pipeline, build_pipeline_with, mount_site, page_text, FakeLlm, FakeProvider,
    ANALYSIS_REPLY, CALLER,
};
use seocrawl::domain::models::discovery::{DiscoveryResult, DiscoveryStrategy};
use seocrawl::domain::models::page::PageContent;
use seocrawl::domain::models::seo::Industry;
use seocrawl::domain::models::workflow::{
    ProviderKind, RunStatus, StepName, StepStatus, WorkflowRun,
};
use seocrawl::domain::repositories::seo_settings_repository::SeoSettingsRepository;
use seocrawl::domain::repositories::workflow_run_repository::{
    RepositoryError, WorkflowRunRepository,
};
use seocrawl::engines::traits::{BatchSummary, ProviderError};
use seocrawl::workers::manager::WorkerManager;
use seocrawl::workers::workflow_worker::ScrapeStepOutput;
use std::time::Duration;
use uuid::Uuid;
use wiremock::MockServer;

const OFFLINE_ROOT: &str = "https://acme-plumbing.test/";

fn new_run(root_url: &str) -> WorkflowRun {
    WorkflowRun::new(CALLER, "client-1", root_url, ProviderKind::Reader, 10)
}

fn root_of(server: &MockServer) -> String {
    format!("{}/", server.uri())
}

/// 为站点上的每个页面准备抓取内容
fn provider_for(pages: &[String]) -> FakeProvider {
    pages.iter().fold(FakeProvider::new(), |provider, url| {
        provider.with_page(url.clone(), page_text(url))
    })
}

async fn wait_for_terminal(runs: &dyn WorkflowRunRepository, run_id: Uuid) -> WorkflowRun {
    for _ in 0..100 {
        let run = runs.find_by_id(run_id).await.unwrap().unwrap();
        if run.status.is_terminal() {
            return run;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("run {} did not finish", run_id);
}

/// 完整流程：发现、抓取、聚合、分析并保存SEO设置
#[tokio::test]
async fn test_pipeline_success() {
    let server = MockServer::start().await;
    let pages = mount_site(&server).await;
    let pipeline = build_pipeline(provider_for(&pages), FakeLlm::new(ANALYSIS_REPLY)).await;

    let run = new_run(&root_of(&server));
    pipeline.runs.create(&run).await.unwrap();

    let finished = pipeline.worker.execute(run.id).await.unwrap();

    assert_eq!(finished.status, RunStatus::Completed);
    let outcome = finished.result.clone().unwrap();
    assert!(outcome.success);
    assert_eq!(outcome.failed_stage, None);
    assert_eq!(outcome.pages_discovered, 4);
    assert_eq!(outcome.pages_scraped, 4);
    assert_eq!(outcome.pages_analyzed, 4);

    let analysis = outcome.analysis.unwrap();
    assert_eq!(analysis.industry, Industry::HomeServices);
    assert_eq!(analysis.location.as_deref(), Some("Austin, TX"));
    assert_eq!(analysis.keywords.len(), 3);

    let stored = pipeline.runs.find_by_id(run.id).await.unwrap().unwrap();
    assert_eq!(stored.status, RunStatus::Completed);
    let names: Vec<StepName> = stored.steps.iter().map(|s| s.name).collect();
    assert_eq!(
        names,
        vec![
            StepName::Discover,
            StepName::Scrape,
            StepName::Aggregate,
            StepName::Analyze
        ]
    );
    assert!(stored
        .steps
        .iter()
        .all(|s| s.status == StepStatus::Completed && s.attempts == 1));

    let settings = pipeline
        .seo
        .find_by_client("client-1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(settings.industry, Industry::HomeServices);
    assert_eq!(settings.keywords[0], "emergency plumber austin");
    assert_eq!(settings.source_url, root_of(&server));
    assert_eq!(pipeline.llm.calls(), 1);
}

/// 部分页面失败时运行仍然成功
#[tokio::test]
async fn test_pipeline_partial_scrape_failures() {
    let server = MockServer::start().await;
    let pages = mount_site(&server).await;
    let provider = provider_for(&pages[..2]);
    let pipeline = build_pipeline(provider, FakeLlm::new(ANALYSIS_REPLY)).await;

    let run = new_run(&root_of(&server));
    pipeline.runs.create(&run).await.unwrap();
    let finished = pipeline.worker.execute(run.id).await.unwrap();

    assert_eq!(finished.status, RunStatus::Completed);
    let outcome = finished.result.unwrap();
    assert_eq!(outcome.pages_discovered, 4);
    assert_eq!(outcome.pages_scraped, 2);
    assert_eq!(outcome.pages_analyzed, 2);
}

/// 全部页面抓取失败时在抓取阶段失败，不调用模型
#[tokio::test]
async fn test_pipeline_all_pages_fail() {
    let server = MockServer::start().await;
    mount_site(&server).await;
    let pipeline = build_pipeline(FakeProvider::new(), FakeLlm::new(ANALYSIS_REPLY)).await;

    let run = new_run(&root_of(&server));
    pipeline.runs.create(&run).await.unwrap();
    let finished = pipeline.worker.execute(run.id).await.unwrap();

    assert_eq!(finished.status, RunStatus::Failed);
    let outcome = finished.result.clone().unwrap();
    assert!(!outcome.success);
    assert_eq!(outcome.failed_stage, Some(StepName::Scrape));
    assert_eq!(outcome.pages_discovered, 4);
    assert_eq!(outcome.pages_scraped, 0);
    assert!(finished
        .error
        .as_deref()
        .unwrap()
        .contains("All pages failed to scrape"));
    assert!(finished.step(StepName::Aggregate).is_none());
    assert_eq!(pipeline.llm.calls(), 0);
    assert!(pipeline
        .seo
        .find_by_client("client-1")
        .await
        .unwrap()
        .is_none());
}

/// 不可重试的提供方错误只尝试一次
#[tokio::test]
async fn test_pipeline_provider_error_fails_scrape() {
    let server = MockServer::start().await;
    mount_site(&server).await;
    let provider =
        FakeProvider::new().failing_with(|| ProviderError::InvalidResponse("missing data".into()));
    let pipeline = build_pipeline(provider, FakeLlm::new(ANALYSIS_REPLY)).await;

    let run = new_run(&root_of(&server));
    pipeline.runs.create(&run).await.unwrap();
    let finished = pipeline.worker.execute(run.id).await.unwrap();

    assert_eq!(finished.status, RunStatus::Failed);
    assert_eq!(
        finished.result.unwrap().failed_stage,
        Some(StepName::Scrape)
    );
    assert!(finished.error.unwrap().starts_with("Scraping failed"));
    assert_eq!(pipeline.provider.batch_calls(), 1);
}

/// 可重试的提供方错误按策略重试后失败
#[tokio::test]
async fn test_pipeline_retries_transient_provider_errors() {
    let server = MockServer::start().await;
    mount_site(&server).await;
    let provider = FakeProvider::new().failing_with(|| ProviderError::HttpStatus(503));
    let pipeline = build_pipeline(provider, FakeLlm::new(ANALYSIS_REPLY)).await;

    let run = new_run(&root_of(&server));
    pipeline.runs.create(&run).await.unwrap();
    let finished = pipeline.worker.execute(run.id).await.unwrap();

    assert_eq!(finished.status, RunStatus::Failed);
    assert_eq!(pipeline.provider.batch_calls(), 2);
    let step = finished.step(StepName::Scrape).unwrap();
    assert_eq!(step.status, StepStatus::Failed);
    assert_eq!(step.attempts, 2);
}

/// 发现不到页面时在发现阶段失败
#[tokio::test]
async fn test_pipeline_discovery_failure() {
    let server = MockServer::start().await;
    let pipeline = build_pipeline(FakeProvider::new(), FakeLlm::new(ANALYSIS_REPLY)).await;

    let run = new_run(&root_of(&server));
    pipeline.runs.create(&run).await.unwrap();
    let finished = pipeline.worker.execute(run.id).await.unwrap();

    assert_eq!(finished.status, RunStatus::Failed);
    let outcome = finished.result.unwrap();
    assert_eq!(outcome.failed_stage, Some(StepName::Discover));
    assert_eq!(outcome.pages_discovered, 0);
    assert_eq!(pipeline.provider.batch_calls(), 0);
}

/// 内容过短时在分析阶段失败，不保存SEO设置
#[tokio::test]
async fn test_pipeline_content_too_short() {
    let server = MockServer::start().await;
    let pages = mount_site(&server).await;
    // Only the homepage has content, and too little of it
    let provider = FakeProvider::new().with_page(pages[3].clone(), "Call us");
    let pipeline = build_pipeline(provider, FakeLlm::new(ANALYSIS_REPLY)).await;

    let run = new_run(&root_of(&server));
    pipeline.runs.create(&run).await.unwrap();
    let finished = pipeline.worker.execute(run.id).await.unwrap();

    assert_eq!(finished.status, RunStatus::Failed);
    let outcome = finished.result.unwrap();
    assert_eq!(outcome.failed_stage, Some(StepName::Analyze));
    assert_eq!(outcome.pages_scraped, 1);
    assert_eq!(outcome.pages_analyzed, 0);
    assert_eq!(pipeline.llm.calls(), 0);
    assert!(pipeline
        .seo
        .find_by_client("client-1")
        .await
        .unwrap()
        .is_none());
}

/// 自带爬取的提供方跳过URL发现
#[tokio::test]
async fn test_pipeline_native_provider_skips_discovery() {
    let provider = FakeProvider::new()
        .native()
        .with_page(OFFLINE_ROOT, page_text("home"))
        .with_page(format!("{}about", OFFLINE_ROOT), page_text("about"))
        .with_page(format!("{}services", OFFLINE_ROOT), page_text("services"));
    let pipeline = build_pipeline(provider, FakeLlm::new(ANALYSIS_REPLY)).await;

    let run = new_run(OFFLINE_ROOT);
    pipeline.runs.create(&run).await.unwrap();
    let finished = pipeline.worker.execute(run.id).await.unwrap();

    assert_eq!(finished.status, RunStatus::Completed);
    let discovered: DiscoveryResult =
        serde_json::from_value(finished.completed_output(StepName::Discover).unwrap().clone())
            .unwrap();
    assert_eq!(discovered.strategy, DiscoveryStrategy::None);
    assert_eq!(discovered.urls, vec![OFFLINE_ROOT.to_string()]);

    let outcome = finished.result.unwrap();
    assert_eq!(outcome.pages_discovered, 3);
    assert_eq!(outcome.pages_scraped, 3);
}

/// 自带爬取的提供方没有返回页面时，发现数量仍以根地址计
#[tokio::test]
async fn test_pipeline_native_provider_without_pages_fails() {
    let pipeline = build_pipeline(FakeProvider::new().native(), FakeLlm::new(ANALYSIS_REPLY)).await;

    let run = new_run(OFFLINE_ROOT);
    pipeline.runs.create(&run).await.unwrap();
    let finished = pipeline.worker.execute(run.id).await.unwrap();

    assert_eq!(finished.status, RunStatus::Failed);
    let outcome = finished.result.unwrap();
    assert_eq!(outcome.failed_stage, Some(StepName::Scrape));
    assert_eq!(outcome.pages_discovered, 1);
    assert_eq!(outcome.pages_scraped, 0);
    assert_eq!(pipeline.llm.calls(), 0);
}

/// 恢复执行时复用已完成步骤的输出
#[tokio::test]
async fn test_resume_skips_completed_steps() {
    let pipeline = build_pipeline(FakeProvider::new(), FakeLlm::new(ANALYSIS_REPLY)).await;

    let mut run = new_run(OFFLINE_ROOT);
    pipeline.runs.create(&run).await.unwrap();
    run.start().unwrap();
    pipeline.runs.update_run(&run).await.unwrap();

    let urls = vec![
        OFFLINE_ROOT.to_string(),
        format!("{}services", OFFLINE_ROOT),
    ];
    let discovered = DiscoveryResult {
        root_url: OFFLINE_ROOT.to_string(),
        urls: urls.clone(),
        strategy: DiscoveryStrategy::Sitemap,
        errors: Vec::new(),
    };
    let scraped = ScrapeStepOutput {
        success: true,
        pages: urls
            .iter()
            .map(|u| PageContent::new(u.clone(), page_text(u)))
            .collect(),
        summary: BatchSummary {
            total_scraped: 2,
            total_failed: 0,
        },
        error: None,
    };

    for (name, output) in [
        (StepName::Discover, serde_json::to_value(&discovered).unwrap()),
        (StepName::Scrape, serde_json::to_value(&scraped).unwrap()),
    ] {
        let step = run.step_mut(name);
        step.status = StepStatus::Completed;
        step.attempts = 1;
        step.output = Some(output);
        let step = step.clone();
        pipeline.runs.upsert_step(run.id, &step).await.unwrap();
    }

    let finished = pipeline.worker.execute(run.id).await.unwrap();

    assert_eq!(finished.status, RunStatus::Completed);
    assert_eq!(pipeline.provider.batch_calls(), 0);
    assert_eq!(pipeline.llm.calls(), 1);
    assert_eq!(finished.step(StepName::Discover).unwrap().attempts, 1);
    assert_eq!(finished.step(StepName::Scrape).unwrap().attempts, 1);

    let outcome = finished.result.unwrap();
    assert_eq!(outcome.pages_discovered, 2);
    assert_eq!(outcome.pages_scraped, 2);
    assert_eq!(outcome.pages_analyzed, 2);
}

/// 终态运行不会再次执行，存储也拒绝将其改回运行中
#[tokio::test]
async fn test_terminal_run_is_final() {
    let provider = FakeProvider::new()
        .native()
        .with_page(OFFLINE_ROOT, page_text("home"));
    let pipeline = build_pipeline(provider, FakeLlm::new(ANALYSIS_REPLY)).await;

    let run = new_run(OFFLINE_ROOT);
    pipeline.runs.create(&run).await.unwrap();
    let finished = pipeline.worker.execute(run.id).await.unwrap();
    assert_eq!(finished.status, RunStatus::Completed);

    let again = pipeline.worker.execute(run.id).await.unwrap();
    assert_eq!(again.status, RunStatus::Completed);
    assert_eq!(pipeline.provider.batch_calls(), 1);
    assert_eq!(pipeline.llm.calls(), 1);

    let mut restarted = finished.clone();
    restarted.status = RunStatus::Running;
    let result = pipeline.runs.update_run(&restarted).await;
    assert!(matches!(
        result,
        Err(RepositoryError::InvalidTransition {
            from: RunStatus::Completed,
            to: RunStatus::Running
        })
    ));
}

/// 超过最长运行时间时运行失败，正在执行的步骤标记为失败
#[tokio::test]
async fn test_run_exceeding_max_duration_fails() {
    let provider = FakeProvider::new()
        .native()
        .with_page(OFFLINE_ROOT, page_text("home"))
        .with_delay(Duration::from_secs(5));
    let pipeline = build_pipeline_with(provider, FakeLlm::new(ANALYSIS_REPLY), |worker| {
        worker.with_max_duration(Duration::from_millis(200))
    })
    .await;

    let run = new_run(OFFLINE_ROOT);
    pipeline.runs.create(&run).await.unwrap();
    let finished = pipeline.worker.execute(run.id).await.unwrap();

    assert_eq!(finished.status, RunStatus::Failed);
    let outcome = finished.result.clone().unwrap();
    assert_eq!(outcome.failed_stage, Some(StepName::Scrape));
    assert!(outcome.error.unwrap().contains("maximum duration"));

    let stored = pipeline.runs.find_by_id(run.id).await.unwrap().unwrap();
    assert_eq!(stored.status, RunStatus::Failed);
    assert_eq!(
        stored.step(StepName::Scrape).unwrap().status,
        StepStatus::Failed
    );
    assert_eq!(
        stored.step(StepName::Discover).unwrap().status,
        StepStatus::Completed
    );
}

/// 启动时恢复未完成的运行
#[tokio::test]
async fn test_manager_resumes_unfinished_runs() {
    let provider = FakeProvider::new()
        .native()
        .with_page(OFFLINE_ROOT, page_text("home"));
    let pipeline = build_pipeline(provider, FakeLlm::new(ANALYSIS_REPLY)).await;

    let pending = new_run(OFFLINE_ROOT);
    pipeline.runs.create(&pending).await.unwrap();

    let manager = WorkerManager::new(pipeline.worker.clone());
    let resumed = manager.resume_unfinished().await.unwrap();
    assert_eq!(resumed, 1);

    let finished = wait_for_terminal(pipeline.runs.as_ref(), pending.id).await;
    assert_eq!(finished.status, RunStatus::Completed);
    assert_eq!(manager.resume_unfinished().await.unwrap(), 0);
}

/// 运行结束后管理器不再持有任务句柄
#[tokio::test]
async fn test_manager_releases_finished_runs() {
    let provider = FakeProvider::new()
        .native()
        .with_page(OFFLINE_ROOT, page_text("home"));
    let pipeline = build_pipeline(provider, FakeLlm::new(ANALYSIS_REPLY)).await;
    let manager = WorkerManager::new(pipeline.worker.clone());

    let run = new_run(OFFLINE_ROOT);
    pipeline.runs.create(&run).await.unwrap();
    manager.spawn_run(run.id);

    let finished = wait_for_terminal(pipeline.runs.as_ref(), run.id).await;
    assert_eq!(finished.status, RunStatus::Completed);

    for _ in 0..100 {
        if manager.active_runs() == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(manager.active_runs(), 0);
    assert!(!manager.is_running(run.id));
}

/// 取消执行中的运行，已完成的运行保持不变
#[tokio::test]
async fn test_manager_cancels_running_run() {
    let provider = FakeProvider::new()
        .native()
        .with_page(OFFLINE_ROOT, page_text("home"))
        .with_delay(Duration::from_secs(5));
    let pipeline = build_pipeline(provider, FakeLlm::new(ANALYSIS_REPLY)).await;
    let manager = WorkerManager::new(pipeline.worker.clone());

    let run = new_run(OFFLINE_ROOT);
    pipeline.runs.create(&run).await.unwrap();
    manager.spawn_run(run.id);

    // Wait until the slow scrape has started
    for _ in 0..100 {
        if pipeline.provider.batch_calls() > 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(manager.is_running(run.id));

    let cancelled = manager.cancel_run(run.id).await.unwrap();
    assert_eq!(cancelled.status, RunStatus::Cancelled);
    assert!(!manager.is_running(run.id));

    let stored = pipeline.runs.find_by_id(run.id).await.unwrap().unwrap();
    assert_eq!(stored.status, RunStatus::Cancelled);

    let again = manager.cancel_run(run.id).await.unwrap();
    assert_eq!(again.status, RunStatus::Cancelled);
}
