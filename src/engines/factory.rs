// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

use crate::config::settings::Settings;
use crate::engines::firecrawl_engine::FirecrawlEngine;
use crate::engines::reader_engine::ReaderEngine;
use crate::engines::traits::{ProviderError, ProviderKind, ScrapeProvider};

/// 抓取提供方注册表
///
/// 按 `ProviderKind` 分派到具体实现
#[derive(Clone, Default)]
pub struct ProviderFactory {
    providers: HashMap<ProviderKind, Arc<dyn ScrapeProvider>>,
    default_kind: ProviderKind,
}

impl ProviderFactory {
    pub fn new(default_kind: ProviderKind) -> Self {
        Self {
            providers: HashMap::new(),
            default_kind,
        }
    }

    /// 根据配置创建全部提供方
    pub fn from_settings(settings: &Settings) -> Result<Self, ProviderError> {
        let reader = ReaderEngine::new(&settings.reader, &settings.crawl)?;
        let firecrawl = FirecrawlEngine::new(&settings.firecrawl, &settings.crawl)?;

        if settings.firecrawl.api_key.is_none() {
            info!("Firecrawl API key not set, requests will be sent unauthenticated");
        }

        Ok(Self::new(settings.crawl.default_provider)
            .with_provider(Arc::new(reader))
            .with_provider(Arc::new(firecrawl)))
    }

    /// 注册提供方，同类型的已有实现会被替换
    pub fn with_provider(mut self, provider: Arc<dyn ScrapeProvider>) -> Self {
        self.providers.insert(provider.kind(), provider);
        self
    }

    pub fn default_kind(&self) -> ProviderKind {
        self.default_kind
    }

    /// 解析请求使用的提供方类型
    pub fn resolve_kind(&self, requested: Option<ProviderKind>) -> ProviderKind {
        requested.unwrap_or(self.default_kind)
    }

    pub fn get(&self, kind: ProviderKind) -> Result<Arc<dyn ScrapeProvider>, ProviderError> {
        self.providers
            .get(&kind)
            .cloned()
            .ok_or_else(|| ProviderError::NotConfigured(kind.to_string()))
    }
}
