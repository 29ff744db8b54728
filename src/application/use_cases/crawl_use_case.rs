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

use std::sync::Arc;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::application::dto::crawl_request::CrawlRequestDto;
use crate::config::settings::CrawlSettings;
use crate::domain::models::workflow::{ProviderKind, WorkflowRun};
use crate::domain::repositories::workflow_run_repository::{
    RepositoryError, WorkflowRunRepository,
};
use crate::domain::services::status_service::{self, StatusReport};
use crate::engines::factory::ProviderFactory;
use crate::engines::validators::validate_url;
use crate::utils::url_utils::normalize_root;
use crate::workers::manager::WorkerManager;

#[derive(Error, Debug)]
pub enum CrawlUseCaseError {
    #[error("Validation failed: {0}")]
    ValidationError(String),
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
    #[error("Run not found")]
    NotFound,
    #[error("Failed to start crawl: {0}")]
    StartFailed(String),
}

/// 爬取用例
///
/// 校验请求、创建运行并交给后台执行，以及查询运行状态
pub struct CrawlUseCase {
    runs: Arc<dyn WorkflowRunRepository>,
    manager: WorkerManager,
    providers: ProviderFactory,
    settings: CrawlSettings,
}

impl CrawlUseCase {
    pub fn new(
        runs: Arc<dyn WorkflowRunRepository>,
        manager: WorkerManager,
        providers: ProviderFactory,
        settings: CrawlSettings,
    ) -> Self {
        Self {
            runs,
            manager,
            providers,
            settings,
        }
    }

    /// 开始一次爬取
    ///
    /// # 返回值
    ///
    /// * `Ok(Uuid)` - 新运行的ID，运行在后台执行
    /// * `Err(CrawlUseCaseError)` - 请求无效或无法创建运行
    pub async fn start_crawl(
        &self,
        caller_id: &str,
        dto: CrawlRequestDto,
    ) -> Result<Uuid, CrawlUseCaseError> {
        dto.validate()
            .map_err(|e| CrawlUseCaseError::ValidationError(e.to_string()))?;

        let client_id = dto.client_id.trim();
        if client_id.is_empty() {
            return Err(CrawlUseCaseError::ValidationError(
                "clientId is required".to_string(),
            ));
        }

        let root = normalize_root(&dto.url)
            .ok_or_else(|| CrawlUseCaseError::ValidationError(format!("Invalid URL: {}", dto.url)))?;

        if !self.settings.allow_private_hosts {
            validate_url(&root)
                .await
                .map_err(|e| CrawlUseCaseError::ValidationError(e.to_string()))?;
        }

        let requested = dto
            .provider
            .as_deref()
            .map(|raw| {
                raw.trim().to_ascii_lowercase().parse::<ProviderKind>().map_err(|_| {
                    CrawlUseCaseError::ValidationError(format!("Unknown provider: {}", raw))
                })
            })
            .transpose()?;
        let kind = self.providers.resolve_kind(requested);
        self.providers
            .get(kind)
            .map_err(|e| CrawlUseCaseError::StartFailed(e.to_string()))?;

        let max_pages = self.settings.clamp_pages(dto.max_pages);
        let run = WorkflowRun::new(caller_id, client_id, root.as_str(), kind, max_pages);
        self.runs.create(&run).await?;

        info!(
            "Accepted crawl {} for {} (client {}, provider {}, max pages {})",
            run.id, run.root_url, run.client_id, kind, max_pages
        );
        self.manager.spawn_run(run.id);

        Ok(run.id)
    }

    /// 查询运行状态，其他调用方的运行视为不存在
    pub async fn get_status(
        &self,
        caller_id: &str,
        run_id: Uuid,
    ) -> Result<StatusReport, CrawlUseCaseError> {
        let run = self
            .runs
            .find_by_id(run_id)
            .await?
            .filter(|run| run.caller_id == caller_id)
            .ok_or(CrawlUseCaseError::NotFound)?;

        Ok(status_service::report(&run))
    }
}
