// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};

/// 单个页面的抓取内容
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageContent {
    /// 页面URL
    pub url: String,
    /// 类Markdown的文本内容
    pub content: String,
    /// 内容字符数（按Unicode标量计）
    pub char_count: usize,
}

impl PageContent {
    pub fn new(url: impl Into<String>, content: impl Into<String>) -> Self {
        let content = content.into();
        Self {
            url: url.into(),
            char_count: content.chars().count(),
            content,
        }
    }

    /// 内容是否为空或只有空白
    pub fn is_blank(&self) -> bool {
        self.content.trim().is_empty()
    }
}

/// 聚合后的内容
///
/// `total_chars` 不会超过聚合时使用的预算，`included_urls` 与
/// `excluded_urls` 不相交且覆盖全部输入页面
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedContent {
    /// 拼接后的文本
    pub text: String,
    /// 被纳入的页面
    pub included_urls: Vec<String>,
    /// 被排除的页面
    pub excluded_urls: Vec<String>,
    /// `text` 的字符数
    pub total_chars: usize,
}

impl AggregatedContent {
    pub fn is_empty(&self) -> bool {
        self.included_urls.is_empty()
    }
}
