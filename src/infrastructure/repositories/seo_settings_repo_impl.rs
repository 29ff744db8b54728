// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use sea_orm::sea_query::OnConflict;
use sea_orm::*;
use std::sync::Arc;

use crate::domain::models::seo::{Industry, SeoSettings};
use crate::domain::repositories::seo_settings_repository::SeoSettingsRepository;
use crate::domain::repositories::workflow_run_repository::RepositoryError;
use crate::infrastructure::database::entities::seo_settings;

/// 客户SEO设置仓库实现
pub struct SeoSettingsRepositoryImpl {
    db: Arc<DatabaseConnection>,
}

impl SeoSettingsRepositoryImpl {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

fn to_domain(m: seo_settings::Model) -> Result<SeoSettings, RepositoryError> {
    let keywords: Vec<String> = serde_json::from_value(m.keywords)
        .map_err(|e| RepositoryError::Serialization(e.to_string()))?;

    Ok(SeoSettings {
        client_id: m.client_id,
        keywords,
        location: m.location,
        industry: Industry::coerce(&m.industry),
        meta_title: m.meta_title,
        meta_description: m.meta_description,
        source_url: m.source_url,
        updated_at: m.updated_at.into(),
    })
}

#[async_trait]
impl SeoSettingsRepository for SeoSettingsRepositoryImpl {
    async fn upsert(&self, settings: &SeoSettings) -> Result<SeoSettings, RepositoryError> {
        let keywords = serde_json::to_value(&settings.keywords)
            .map_err(|e| RepositoryError::Serialization(e.to_string()))?;

        let model = seo_settings::ActiveModel {
            client_id: Set(settings.client_id.clone()),
            keywords: Set(keywords),
            location: Set(settings.location.clone()),
            industry: Set(settings.industry.to_string()),
            meta_title: Set(settings.meta_title.clone()),
            meta_description: Set(settings.meta_description.clone()),
            source_url: Set(settings.source_url.clone()),
            updated_at: Set(settings.updated_at.into()),
        };

        seo_settings::Entity::insert(model)
            .on_conflict(
                OnConflict::column(seo_settings::Column::ClientId)
                    .update_columns([
                        seo_settings::Column::Keywords,
                        seo_settings::Column::Location,
                        seo_settings::Column::Industry,
                        seo_settings::Column::MetaTitle,
                        seo_settings::Column::MetaDescription,
                        seo_settings::Column::SourceUrl,
                        seo_settings::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec(self.db.as_ref())
            .await?;

        Ok(settings.clone())
    }

    async fn find_by_client(&self, client_id: &str) -> Result<Option<SeoSettings>, RepositoryError> {
        seo_settings::Entity::find_by_id(client_id.to_string())
            .one(self.db.as_ref())
            .await?
            .map(to_domain)
            .transpose()
    }
}
