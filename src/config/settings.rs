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

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use crate::domain::models::workflow::ProviderKind;

/// 应用程序配置设置
///
/// 包含服务器、数据库、认证、爬取流水线、抓取提供方和模型等所有配置项
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// 服务器配置
    pub server: ServerSettings,
    /// 数据库配置
    pub database: DatabaseSettings,
    /// 认证配置
    #[serde(default)]
    pub auth: AuthSettings,
    /// 爬取配置
    pub crawl: CrawlSettings,
    /// 内容分析配置
    pub analysis: AnalysisSettings,
    /// 工作流配置
    pub workflow: WorkflowSettings,
    /// 阅读代理提供方配置
    pub reader: ReaderSettings,
    /// 全站爬取提供方配置
    pub firecrawl: FirecrawlSettings,
    /// LLM配置
    pub llm: LlmSettings,
    /// 指标配置
    pub metrics: MetricsSettings,
}

/// 服务器配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    /// 服务器监听主机地址
    pub host: String,
    /// 服务器监听端口
    pub port: u16,
}

/// 数据库配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    /// 数据库连接URL
    pub url: String,
    /// 最大连接数
    pub max_connections: Option<u32>,
    /// 最小连接数
    pub min_connections: Option<u32>,
    /// 连接超时时间（秒）
    pub connect_timeout: Option<u64>,
    /// 空闲连接超时时间（秒）
    pub idle_timeout: Option<u64>,
}

/// 认证配置设置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthSettings {
    /// API密钥到调用方标识的映射
    #[serde(default)]
    pub api_keys: HashMap<String, String>,
}

/// 爬取配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlSettings {
    /// 单次爬取的页面硬上限
    pub max_pages_to_crawl: usize,
    /// 默认页面数
    pub default_pages: usize,
    /// 聚合内容的字符预算
    pub max_aggregated_chars: usize,
    /// 阅读代理并发抓取数
    pub scrape_concurrency: usize,
    /// 单页抓取超时（秒）
    pub page_timeout_secs: u64,
    /// 发现阶段单次请求超时（秒）
    pub discovery_timeout_secs: u64,
    /// 状态客户端轮询间隔（毫秒）
    pub poll_interval_ms: u64,
    /// 未指定时使用的抓取提供方
    pub default_provider: ProviderKind,
    /// 是否允许访问私有地址
    pub allow_private_hosts: bool,
    /// 发现阶段使用的User-Agent
    pub user_agent: String,
}

impl CrawlSettings {
    pub fn page_timeout(&self) -> Duration {
        Duration::from_secs(self.page_timeout_secs)
    }

    pub fn discovery_timeout(&self) -> Duration {
        Duration::from_secs(self.discovery_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// 将请求的页面数限制在 `[1, max_pages_to_crawl]` 内
    ///
    /// 小数向下取整，负数和非有限值按下限或默认值处理
    pub fn clamp_pages(&self, requested: Option<f64>) -> usize {
        let ceiling = self.max_pages_to_crawl.max(1);
        match requested {
            Some(pages) if pages.is_finite() => {
                let pages = pages.floor();
                if pages < 1.0 {
                    1
                } else if pages >= ceiling as f64 {
                    ceiling
                } else {
                    pages as usize
                }
            }
            _ => self.default_pages.clamp(1, ceiling),
        }
    }
}

/// 内容分析配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisSettings {
    /// 可分析的最小字符数
    pub min_content_length: usize,
    /// 提交给模型的最大字符数
    pub max_content_length: usize,
    /// 关键词数量上限
    pub max_keywords: usize,
}

/// 工作流配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowSettings {
    /// 单次运行的最长时间（秒）
    pub max_duration_secs: u64,
    /// 可重试步骤错误的最大重试次数
    pub step_max_retries: u32,
    /// 重试初始退避（毫秒）
    pub retry_initial_backoff_ms: u64,
}

impl WorkflowSettings {
    pub fn max_duration(&self) -> Duration {
        Duration::from_secs(self.max_duration_secs)
    }
}

/// 阅读代理配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct ReaderSettings {
    /// 代理基础URL，页面URL直接拼接在其后
    pub base_url: String,
    /// 可选的API密钥
    pub api_key: Option<String>,
}

/// 全站爬取提供方配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct FirecrawlSettings {
    pub base_url: String,
    pub api_key: Option<String>,
    /// 爬取作业轮询间隔（毫秒）
    pub poll_interval_ms: u64,
    /// 爬取作业总超时（秒）
    pub timeout_secs: u64,
}

/// LLM配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct LlmSettings {
    /// API密钥
    pub api_key: Option<String>,
    /// 模型名称
    pub model: String,
    /// API基础URL
    pub api_base_url: String,
    /// 请求超时（秒）
    pub timeout_secs: u64,
}

/// 指标配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsSettings {
    /// 是否启用Prometheus导出
    pub enabled: bool,
    /// 导出监听地址
    pub listen_addr: String,
}

impl Settings {
    /// 创建新的配置实例
    ///
    /// 按顺序加载内置默认值、`config/default`、`config/{APP_ENVIRONMENT}` 和
    /// `SEOCRAWL__` 前缀的环境变量
    ///
    /// # Returns
    ///
    /// * `Ok(Settings)` - 成功加载的配置
    /// * `Err(ConfigError)` - 配置加载失败
    pub fn new() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "default".to_string());
        let builder = Self::with_defaults(Config::builder())?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(Environment::with_prefix("SEOCRAWL").separator("__"));

        builder.build()?.try_deserialize()
    }

    /// 仅使用内置默认值创建配置
    pub fn defaults() -> Result<Self, ConfigError> {
        Self::with_defaults(Config::builder())?
            .build()?
            .try_deserialize()
    }

    fn with_defaults(
        builder: ConfigBuilder<DefaultState>,
    ) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        builder
            // Server
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            // Default DB pool settings
            .set_default("database.url", "sqlite://seocrawl.db?mode=rwc")?
            .set_default("database.max_connections", 20)?
            .set_default("database.min_connections", 1)?
            .set_default("database.connect_timeout", 10)?
            .set_default("database.idle_timeout", 300)?
            // Crawl pipeline
            .set_default("crawl.max_pages_to_crawl", 20)?
            .set_default("crawl.default_pages", 10)?
            .set_default("crawl.max_aggregated_chars", 100_000)?
            .set_default("crawl.scrape_concurrency", 4)?
            .set_default("crawl.page_timeout_secs", 30)?
            .set_default("crawl.discovery_timeout_secs", 15)?
            .set_default("crawl.poll_interval_ms", 2000)?
            .set_default("crawl.default_provider", "reader")?
            .set_default("crawl.allow_private_hosts", false)?
            .set_default(
                "crawl.user_agent",
                "Mozilla/5.0 (compatible; seocrawl/1.0; +https://seocrawl.dev)",
            )?
            // Analysis
            .set_default("analysis.min_content_length", 100)?
            .set_default("analysis.max_content_length", 50_000)?
            .set_default("analysis.max_keywords", 10)?
            // Workflow
            .set_default("workflow.max_duration_secs", 600)?
            .set_default("workflow.step_max_retries", 3)?
            .set_default("workflow.retry_initial_backoff_ms", 1000)?
            // Providers
            .set_default("reader.base_url", "https://r.jina.ai")?
            .set_default("firecrawl.base_url", "https://api.firecrawl.dev/v1")?
            .set_default("firecrawl.poll_interval_ms", 2000)?
            .set_default("firecrawl.timeout_secs", 120)?
            // LLM
            .set_default("llm.model", "gpt-4o-mini")?
            .set_default("llm.api_base_url", "https://api.openai.com/v1")?
            .set_default("llm.timeout_secs", 60)?
            // Metrics
            .set_default("metrics.enabled", false)?
            .set_default("metrics.listen_addr", "0.0.0.0:9000")
    }
}
