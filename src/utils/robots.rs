// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use url::Url;

use crate::utils::url_utils::resolve_url;

/// 提取 robots.txt 中的全部 `Sitemap:` 指令
///
/// 指令名不区分大小写，与所在的 user-agent 分组无关；相对地址按 `root` 解析，
/// 无法解析的条目会被丢弃
pub fn extract_sitemap_directives(content: &str, root: &Url) -> Vec<String> {
    let mut sitemaps = Vec::new();

    for line in content.lines() {
        // Strip comments
        let line = match line.find('#') {
            Some(idx) => &line[..idx],
            None => line,
        };

        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        if !key.trim().eq_ignore_ascii_case("sitemap") {
            continue;
        }

        let value = value.trim();
        if value.is_empty() {
            continue;
        }

        if let Ok(url) = resolve_url(root, value) {
            let url = url.to_string();
            if !sitemaps.contains(&url) {
                sitemaps.push(url);
            }
        }
    }

    sitemaps
}
