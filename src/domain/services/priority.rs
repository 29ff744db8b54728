// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

/// 未匹配任何模式的页面优先级
pub const DEFAULT_PRIORITY: u32 = 100;

/// 按顺序匹配的路径模式，先匹配者生效
static PRIORITY_PATTERNS: Lazy<Vec<(Regex, u32)>> = Lazy::new(|| {
    [
        (r"^/?$", 0),
        (r"/(about|about-us|who-we-are|our-story|company)(/|$)", 1),
        (r"/(services?|what-we-do|solutions|offerings|products?)(/|$)", 2),
        (r"/(contact|contact-us|get-in-touch|locations?)(/|$)", 3),
        (r"/(pricing|plans|rates|packages)(/|$)", 4),
        (r"/(team|our-team|staff|people|leadership)(/|$)", 5),
        (r"/(faqs?|help|questions)(/|$)", 6),
        (r"/(testimonials|reviews)(/|$)", 7),
        (r"/(portfolio|work|projects|gallery|case-studies)(/|$)", 8),
        (r"/(blog|news|articles|posts?)(/|$)", 10),
    ]
    .into_iter()
    .filter_map(|(pattern, priority)| Regex::new(pattern).ok().map(|re| (re, priority)))
    .collect()
});

/// 计算路径的优先级，数值越小越重要
pub fn priority_for_path(path: &str) -> u32 {
    let path = path.to_ascii_lowercase();
    PRIORITY_PATTERNS
        .iter()
        .find(|(re, _)| re.is_match(&path))
        .map(|(_, priority)| *priority)
        .unwrap_or(DEFAULT_PRIORITY)
}

pub fn priority_for_url(url: &Url) -> u32 {
    priority_for_path(url.path())
}

/// 按优先级稳定排序
pub fn sort_by_priority(urls: &mut [Url]) {
    urls.sort_by_key(priority_for_url);
}
