// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;

use super::workflow_run_repository::RepositoryError;
use crate::domain::models::seo::SeoSettings;

/// 客户SEO设置仓库特质
#[async_trait]
pub trait SeoSettingsRepository: Send + Sync {
    /// 按 `client_id` 插入或覆盖设置，重复调用结果相同
    async fn upsert(&self, settings: &SeoSettings) -> Result<SeoSettings, RepositoryError>;

    async fn find_by_client(&self, client_id: &str) -> Result<Option<SeoSettings>, RepositoryError>;
}
