// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

#![allow(dead_code)]

use async_trait::async_trait;
use sea_orm::DatabaseConnection;
use seocrawl::config::settings::{DatabaseSettings, Settings};
use seocrawl::domain::services::analysis_service::AnalysisService;
use seocrawl::domain::services::discovery_service::DiscoveryService;
use seocrawl::domain::services::llm_service::{LlmClient, LlmCompletion, LlmError, TokenUsage};
use seocrawl::engines::factory::ProviderFactory;
use seocrawl::engines::traits::{
    BatchOutcome, BatchRequest, ProviderError, ProviderKind, ScrapeOutcome, ScrapeProvider,
};
use seocrawl::infrastructure::database::connection;
use seocrawl::infrastructure::repositories::seo_settings_repo_impl::SeoSettingsRepositoryImpl;
use seocrawl::infrastructure::repositories::workflow_run_repo_impl::WorkflowRunRepositoryImpl;
use seocrawl::utils::retry_policy::RetryPolicy;
use seocrawl::workers::workflow_worker::WorkflowWorker;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// 测试用API密钥及其调用方
pub const API_KEY: &str = "test-key";
pub const CALLER: &str = "caller-a";
pub const OTHER_API_KEY: &str = "other-key";
pub const OTHER_CALLER: &str = "caller-b";

/// 模型返回的合法分析结果
pub const ANALYSIS_REPLY: &str = r#"Here is the analysis:
{
  "keywords": ["emergency plumber austin", "water heater repair", "drain cleaning"],
  "location": "Austin, TX",
  "industry": "Home Services",
  "metaTitle": "Acme Plumbing | 24/7 Plumbers in Austin",
  "metaDescription": "Licensed Austin plumbers for repairs, drains and water heaters."
}"#;

/// 内置默认值加上测试覆盖项
pub fn test_settings() -> Settings {
    let mut settings = Settings::defaults().unwrap();
    settings.crawl.allow_private_hosts = true;
    settings.crawl.discovery_timeout_secs = 5;
    settings.workflow.step_max_retries = 1;
    settings.workflow.retry_initial_backoff_ms = 10;
    settings.auth.api_keys = HashMap::from([
        (API_KEY.to_string(), CALLER.to_string()),
        (OTHER_API_KEY.to_string(), OTHER_CALLER.to_string()),
    ]);
    settings
}

/// 单连接的内存数据库，已执行迁移
pub async fn test_db() -> Arc<DatabaseConnection> {
    let settings = DatabaseSettings {
        url: "sqlite::memory:".to_string(),
        max_connections: Some(1),
        min_connections: None,
        connect_timeout: Some(5),
        idle_timeout: None,
    };
    Arc::new(connection::connect_and_migrate(&settings).await.unwrap())
}

/// 足够长、可以通过内容长度检查的页面文本
pub fn page_text(topic: &str) -> String {
    format!(
        "Acme Plumbing {topic}. We are a family owned plumbing company serving Austin, Texas \
         since 1998. Our licensed plumbers handle emergency repairs, water heaters, drain \
         cleaning and remodeling for homes and small businesses."
    )
}

/// 可编程的抓取提供方
///
/// 按URL返回预设内容，未预设的URL按 404 处理
pub struct FakeProvider {
    pages: HashMap<String, String>,
    native: bool,
    delay: Option<Duration>,
    failure: Option<fn() -> ProviderError>,
    calls: AtomicUsize,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self {
            pages: HashMap::new(),
            native: false,
            delay: None,
            failure: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_page(mut self, url: impl Into<String>, content: impl Into<String>) -> Self {
        self.pages.insert(url.into(), content.into());
        self
    }

    /// 模拟自带爬取的提供方，忽略请求中的URL
    pub fn native(mut self) -> Self {
        self.native = true;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// 每次批量抓取都返回该错误
    pub fn failing_with(mut self, failure: fn() -> ProviderError) -> Self {
        self.failure = Some(failure);
        self
    }

    pub fn batch_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ScrapeProvider for FakeProvider {
    async fn fetch(&self, url: &str) -> Result<String, ProviderError> {
        self.pages
            .get(url)
            .cloned()
            .ok_or(ProviderError::HttpStatus(404))
    }

    async fn scrape_many(&self, request: &BatchRequest) -> Result<BatchOutcome, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(failure) = self.failure {
            return Err(failure());
        }

        let mut outcomes = Vec::new();
        if self.native {
            let mut urls: Vec<&String> = self.pages.keys().collect();
            urls.sort();
            for url in urls.into_iter().take(request.max_pages) {
                outcomes.push(ScrapeOutcome::ok(url.clone(), self.pages[url].clone()));
            }
        } else {
            for url in request.urls.iter().take(request.max_pages) {
                outcomes.push(self.scrape_one(url).await);
            }
        }
        Ok(BatchOutcome::new(outcomes))
    }

    fn native_crawl(&self) -> bool {
        self.native
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Reader
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

/// 返回固定回复的模型客户端
pub struct FakeLlm {
    reply: String,
    calls: AtomicUsize,
}

impl FakeLlm {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmClient for FakeLlm {
    async fn complete(&self, _system: &str, _prompt: &str) -> Result<LlmCompletion, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(LlmCompletion {
            content: self.reply.clone(),
            usage: TokenUsage::default(),
        })
    }
}

/// 组装好的工作流及其依赖
pub struct TestPipeline {
    pub settings: Settings,
    pub runs: Arc<WorkflowRunRepositoryImpl>,
    pub seo: Arc<SeoSettingsRepositoryImpl>,
    pub provider: Arc<FakeProvider>,
    pub llm: Arc<FakeLlm>,
    pub providers: ProviderFactory,
    pub worker: Arc<WorkflowWorker>,
}

pub async fn build_pipeline(provider: FakeProvider, llm: FakeLlm) -> TestPipeline {
    build_pipeline_with(provider, llm, |worker| worker).await
}

/// 允许调整工作流执行器（例如缩短最长运行时间）
pub async fn build_pipeline_with(
    provider: FakeProvider,
    llm: FakeLlm,
    configure: impl FnOnce(WorkflowWorker) -> WorkflowWorker,
) -> TestPipeline {
    let settings = test_settings();
    let db = test_db().await;
    let runs = Arc::new(WorkflowRunRepositoryImpl::new(db.clone()));
    let seo = Arc::new(SeoSettingsRepositoryImpl::new(db));
    let provider = Arc::new(provider);
    let llm = Arc::new(llm);

    let providers =
        ProviderFactory::new(ProviderKind::Reader).with_provider(provider.clone());
    let discovery = DiscoveryService::new(&settings.crawl).unwrap();
    let analysis = Arc::new(AnalysisService::new(
        llm.clone(),
        settings.analysis.clone(),
    ));

    let worker = WorkflowWorker::new(
        runs.clone(),
        seo.clone(),
        discovery,
        providers.clone(),
        analysis,
        &settings,
    )
    .with_retry_policy(RetryPolicy {
        max_retries: 1,
        initial_backoff: Duration::from_millis(10),
        max_backoff: Duration::from_millis(20),
        enable_jitter: false,
        ..RetryPolicy::default()
    });

    TestPipeline {
        settings,
        runs,
        seo,
        provider,
        llm,
        providers,
        worker: Arc::new(configure(worker)),
    }
}

/// 指向模拟服务器的URL
pub fn site_url(server: &MockServer, page: &str) -> String {
    format!("{}{}", server.uri(), page)
}

pub fn urlset(urls: &[String]) -> String {
    let entries: String = urls
        .iter()
        .map(|u| format!("<url><loc>{}</loc></url>", u))
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">{}</urlset>"#,
        entries
    )
}

pub fn sitemap_index(sitemaps: &[String]) -> String {
    let entries: String = sitemaps
        .iter()
        .map(|u| format!("<sitemap><loc>{}</loc></sitemap>", u))
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><sitemapindex xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">{}</sitemapindex>"#,
        entries
    )
}

/// 在模拟服务器上挂载一个返回 200 的路径
pub async fn serve(server: &MockServer, route: &str, body: impl Into<String>) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_string(body.into()))
        .mount(server)
        .await;
}

/// 模拟一个带站点地图的小型站点，返回站点上的页面URL
pub async fn mount_site(server: &MockServer) -> Vec<String> {
    let pages = vec![
        site_url(server, "/blog/news"),
        site_url(server, "/services"),
        site_url(server, "/about"),
        site_url(server, "/"),
    ];
    serve(server, "/sitemap.xml", urlset(&pages)).await;
    pages
}
