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

use seocrawl::application::use_cases::crawl_use_case::CrawlUseCase;
use seocrawl::config::settings::Settings;
use seocrawl::domain::repositories::seo_settings_repository::SeoSettingsRepository;
use seocrawl::domain::repositories::workflow_run_repository::WorkflowRunRepository;
use seocrawl::domain::services::analysis_service::AnalysisService;
use seocrawl::domain::services::discovery_service::DiscoveryService;
use seocrawl::domain::services::llm_service::LlmService;
use seocrawl::engines::factory::ProviderFactory;
use seocrawl::infrastructure::database::connection;
use seocrawl::infrastructure::repositories::seo_settings_repo_impl::SeoSettingsRepositoryImpl;
use seocrawl::infrastructure::repositories::workflow_run_repo_impl::WorkflowRunRepositoryImpl;
use seocrawl::presentation::middleware::auth_middleware::AuthState;
use seocrawl::presentation::routes;
use seocrawl::workers::manager::WorkerManager;
use seocrawl::workers::workflow_worker::WorkflowWorker;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

use seocrawl::utils::telemetry;

/// 主函数
///
/// 应用程序入口点，负责初始化所有组件并启动服务
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize logging
    telemetry::init_telemetry();
    info!("Starting seocrawl...");

    // 2. Load configuration
    let settings = Arc::new(Settings::new()?);
    info!("Configuration loaded");

    // Initialize Prometheus Metrics
    seocrawl::infrastructure::metrics::init_metrics(&settings.metrics);

    // 3. Connect to database and run migrations
    let db = Arc::new(connection::connect_and_migrate(&settings.database).await?);
    info!("Database connection established");

    let run_repo: Arc<dyn WorkflowRunRepository> =
        Arc::new(WorkflowRunRepositoryImpl::new(db.clone()));
    let seo_repo: Arc<dyn SeoSettingsRepository> =
        Arc::new(SeoSettingsRepositoryImpl::new(db.clone()));

    // 4. Initialize providers and services
    let providers = ProviderFactory::from_settings(&settings)?;
    let discovery = DiscoveryService::new(&settings.crawl)?;
    if settings.llm.api_key.is_none() {
        warn!("llm.api_key is not set, analysis steps will fail");
    }
    let llm = Arc::new(LlmService::new(&settings.llm)?);
    let analysis = Arc::new(AnalysisService::new(llm, settings.analysis.clone()));

    // 5. Start workers and resume unfinished runs
    let worker = Arc::new(WorkflowWorker::new(
        run_repo.clone(),
        seo_repo,
        discovery,
        providers.clone(),
        analysis,
        &settings,
    ));
    let manager = WorkerManager::new(worker);
    let resumed = manager.resume_unfinished().await?;
    info!("Resumed {} unfinished runs", resumed);

    // 6. Start HTTP server
    let use_case = Arc::new(CrawlUseCase::new(
        run_repo,
        manager.clone(),
        providers,
        settings.crawl.clone(),
    ));
    let app = routes::build_router(use_case, AuthState::from_settings(&settings.auth));

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    let shutdown_manager = manager.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown_manager.wait_for_shutdown().await })
        .await?;

    Ok(())
}
