// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};

/// 产生发现结果的策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryStrategy {
    /// `/sitemap.xml`
    Sitemap,
    /// robots.txt 中声明的站点地图
    RobotsSitemap,
    /// 首页超链接
    HomepageLinks,
    /// 未执行发现（由提供方自行爬取）
    None,
}

/// 发现过程中被吞掉的非致命问题
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryIssue {
    /// 出错的来源URL
    pub source: String,
    pub message: String,
}

/// URL发现结果
///
/// `urls` 已按优先级排序、去重并截断到请求的页面数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryResult {
    /// 规范化后的根URL
    pub root_url: String,
    /// 待抓取的URL列表
    pub urls: Vec<String>,
    /// 最终生效的策略
    pub strategy: DiscoveryStrategy,
    /// 非致命错误
    #[serde(default)]
    pub errors: Vec<DiscoveryIssue>,
}

impl DiscoveryResult {
    /// 创建不做发现的直通结果，只包含根URL
    pub fn pass_through(root_url: &str) -> Self {
        Self {
            root_url: root_url.to_string(),
            urls: vec![root_url.to_string()],
            strategy: DiscoveryStrategy::None,
            errors: Vec::new(),
        }
    }

    pub fn count(&self) -> usize {
        self.urls.len()
    }
}
