// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use std::collections::{HashSet, VecDeque};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::config::settings::CrawlSettings;
use crate::domain::models::discovery::{DiscoveryIssue, DiscoveryResult, DiscoveryStrategy};
use crate::domain::services::priority::sort_by_priority;
use crate::engines::validators::validate_url;
use crate::utils::robots::extract_sitemap_directives;
use crate::utils::sitemap::{parse_sitemap, SitemapDocument};
use crate::utils::url_utils::{
    dedupe_key, has_skipped_extension, normalize_root, resolve_url, root_origin, same_host,
};

static ANCHOR_SELECTOR: Lazy<Option<Selector>> = Lazy::new(|| Selector::parse("a[href]").ok());

/// URL发现错误
#[derive(Error, Debug, PartialEq, Eq)]
pub enum DiscoveryError {
    /// 输入无法规范化为 http(s) 根URL
    #[error("Invalid URL: {0}")]
    InvalidInput(String),
    /// 全部策略都没有得到可用URL
    #[error("No pages found for {0}")]
    NoPagesFound(String),
}

/// URL发现服务
///
/// 依次尝试 `/sitemap.xml`、robots.txt 中的站点地图和首页链接，
/// 前一策略得到零个可用URL时才尝试下一个
#[derive(Clone)]
pub struct DiscoveryService {
    client: reqwest::Client,
    allow_private_hosts: bool,
}

impl DiscoveryService {
    pub fn new(settings: &CrawlSettings) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(settings.user_agent.as_str())
            .timeout(settings.discovery_timeout())
            .build()?;
        Ok(Self {
            client,
            allow_private_hosts: settings.allow_private_hosts,
        })
    }

    /// 发现站点中最重要的页面
    ///
    /// # 参数
    ///
    /// * `root_input` - 用户输入的站点地址，缺少协议时补全 `https://`
    /// * `max_pages` - 返回的URL上限
    ///
    /// # 返回值
    ///
    /// * `Ok(DiscoveryResult)` - 按优先级排序的URL
    /// * `Err(DiscoveryError)` - 输入无效或没有发现任何页面
    #[instrument(skip(self))]
    pub async fn discover(
        &self,
        root_input: &str,
        max_pages: usize,
    ) -> Result<DiscoveryResult, DiscoveryError> {
        let root = normalize_root(root_input)
            .ok_or_else(|| DiscoveryError::InvalidInput(root_input.to_string()))?;
        let origin = root_origin(&root);
        let mut errors = Vec::new();

        // 1. /sitemap.xml
        let candidates = self
            .collect_sitemap_urls(&root, vec![format!("{}/sitemap.xml", origin)], &mut errors)
            .await;
        let urls = filter_and_rank(&root, candidates, max_pages);
        if !urls.is_empty() {
            return Ok(Self::finish(&root, urls, DiscoveryStrategy::Sitemap, errors));
        }

        // 2. Sitemap directives in robots.txt
        let robots_url = format!("{}/robots.txt", origin);
        match self.fetch(&robots_url).await {
            Ok(body) => {
                let directives = extract_sitemap_directives(&String::from_utf8_lossy(&body), &root);
                debug!("robots.txt lists {} sitemaps", directives.len());
                if !directives.is_empty() {
                    let candidates = self
                        .collect_sitemap_urls(&root, directives, &mut errors)
                        .await;
                    let urls = filter_and_rank(&root, candidates, max_pages);
                    if !urls.is_empty() {
                        return Ok(Self::finish(
                            &root,
                            urls,
                            DiscoveryStrategy::RobotsSitemap,
                            errors,
                        ));
                    }
                }
            }
            Err(message) => record(&mut errors, &robots_url, message),
        }

        // 3. Homepage links
        match self.fetch(root.as_str()).await {
            Ok(body) => {
                let mut candidates = vec![root.to_string()];
                candidates.extend(extract_links(&String::from_utf8_lossy(&body), &root));
                let urls = filter_and_rank(&root, candidates, max_pages);
                if !urls.is_empty() {
                    return Ok(Self::finish(
                        &root,
                        urls,
                        DiscoveryStrategy::HomepageLinks,
                        errors,
                    ));
                }
            }
            Err(message) => record(&mut errors, root.as_str(), message),
        }

        warn!(
            "Discovery found no pages for {} ({} issues)",
            root,
            errors.len()
        );
        Err(DiscoveryError::NoPagesFound(root.to_string()))
    }

    fn finish(
        root: &Url,
        urls: Vec<String>,
        strategy: DiscoveryStrategy,
        errors: Vec<DiscoveryIssue>,
    ) -> DiscoveryResult {
        info!(
            "Discovered {} pages for {} via {:?}",
            urls.len(),
            root,
            strategy
        );
        DiscoveryResult {
            root_url: root.to_string(),
            urls,
            strategy,
            errors,
        }
    }

    /// 广度优先展开站点地图及其索引，已访问的地图不会重复请求
    ///
    /// 站点地图可以托管在其他主机上，页面URL的主机过滤在 [`filter_and_rank`] 中完成
    async fn collect_sitemap_urls(
        &self,
        root: &Url,
        seeds: Vec<String>,
        errors: &mut Vec<DiscoveryIssue>,
    ) -> Vec<String> {
        let mut queue: VecDeque<String> = seeds.into();
        let mut visited: HashSet<String> = HashSet::new();
        let mut pages = Vec::new();

        while let Some(sitemap_url) = queue.pop_front() {
            if !visited.insert(sitemap_url.clone()) {
                continue;
            }

            if let Err(message) = self.check_sitemap_location(root, &sitemap_url).await {
                record(errors, &sitemap_url, message);
                continue;
            }

            let body = match self.fetch(&sitemap_url).await {
                Ok(body) => body,
                Err(message) => {
                    record(errors, &sitemap_url, message);
                    continue;
                }
            };

            match parse_sitemap(&body) {
                Ok(SitemapDocument::UrlSet(urls)) => {
                    debug!("Sitemap {} lists {} urls", sitemap_url, urls.len());
                    pages.extend(urls);
                }
                Ok(SitemapDocument::Index(children)) => {
                    debug!("Sitemap index {} lists {} sitemaps", sitemap_url, children.len());
                    queue.extend(children);
                }
                Ok(SitemapDocument::Unknown) => {
                    debug!("Ignoring unrecognized XML at {}", sitemap_url);
                }
                Err(e) => record(errors, &sitemap_url, e.to_string()),
            }
        }

        pages
    }

    /// 站点地图地址必须是 http(s)，其他主机上的地址还需通过私有地址检查
    async fn check_sitemap_location(&self, root: &Url, sitemap_url: &str) -> Result<(), String> {
        let parsed = Url::parse(sitemap_url).map_err(|e| format!("invalid sitemap URL: {}", e))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(format!("unsupported sitemap scheme: {}", parsed.scheme()));
        }
        if same_host(root, &parsed) || self.allow_private_hosts {
            return Ok(());
        }
        validate_url(&parsed).await.map_err(|e| e.to_string())
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>, String> {
        let response = self.client.get(url).send().await.map_err(|e| e.to_string())?;
        let status = response.status();
        if !status.is_success() {
            return Err(format!("HTTP {}", status.as_u16()));
        }
        response
            .bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(|e| e.to_string())
    }
}

fn record(errors: &mut Vec<DiscoveryIssue>, source: &str, message: String) {
    debug!("Discovery issue at {}: {}", source, message);
    errors.push(DiscoveryIssue {
        source: source.to_string(),
        message,
    });
}

/// 提取页面中的超链接
///
/// 跳过锚点、`mailto:`、`tel:` 和 `javascript:` 链接，相对链接按 `base` 解析
pub fn extract_links(html: &str, base: &Url) -> Vec<String> {
    let Some(selector) = ANCHOR_SELECTOR.as_ref() else {
        return Vec::new();
    };
    let document = Html::parse_document(html);
    let mut links = Vec::new();

    for element in document.select(selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let href = href.trim();
        let lower = href.to_ascii_lowercase();
        if href.is_empty()
            || href.starts_with('#')
            || lower.starts_with("mailto:")
            || lower.starts_with("tel:")
            || lower.starts_with("javascript:")
        {
            continue;
        }

        if let Ok(mut url) = resolve_url(base, href) {
            url.set_fragment(None);
            if matches!(url.scheme(), "http" | "https") {
                links.push(url.to_string());
            }
        }
    }

    links
}

/// 过滤、去重、按优先级排序并截断候选URL
///
/// 只保留与根URL同主机的 http(s) 页面，跳过静态资源扩展名
pub fn filter_and_rank(root: &Url, candidates: Vec<String>, max_pages: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut kept: Vec<Url> = Vec::new();

    for raw in candidates {
        let Ok(mut url) = resolve_url(root, raw.trim()) else {
            continue;
        };
        url.set_fragment(None);

        if !matches!(url.scheme(), "http" | "https")
            || !same_host(root, &url)
            || has_skipped_extension(&url)
        {
            continue;
        }

        if seen.insert(dedupe_key(&url)) {
            kept.push(url);
        }
    }

    sort_by_priority(&mut kept);
    kept.truncate(max_pages);
    kept.into_iter().map(|u| u.to_string()).collect()
}
