// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use tracing::debug;

use crate::domain::models::page::{AggregatedContent, PageContent};

const SECTION_SEPARATOR: &str = "\n\n";

fn section_for(page: &PageContent) -> String {
    format!("--- PAGE: {} ---\n\n{}", page.url, page.content)
}

/// 将页面内容按顺序打包进字符预算
///
/// 超出预算的页面被排除，后续页面仍会尝试放入。空白页面同样记为排除
pub fn aggregate(pages: &[PageContent], max_chars: usize) -> AggregatedContent {
    let separator_len = SECTION_SEPARATOR.chars().count();
    let mut sections: Vec<String> = Vec::new();
    let mut result = AggregatedContent::default();

    for page in pages {
        if page.is_blank() {
            result.excluded_urls.push(page.url.clone());
            continue;
        }

        let section = section_for(page);
        let section_len = section.chars().count();
        let joined_len = if sections.is_empty() {
            section_len
        } else {
            section_len + separator_len
        };

        if result.total_chars + joined_len > max_chars {
            debug!(
                "Excluding {} ({} chars) from aggregate, budget {} used {}",
                page.url, section_len, max_chars, result.total_chars
            );
            result.excluded_urls.push(page.url.clone());
            continue;
        }

        result.total_chars += joined_len;
        result.included_urls.push(page.url.clone());
        sections.push(section);
    }

    result.text = sections.join(SECTION_SEPARATOR);
    result
}
