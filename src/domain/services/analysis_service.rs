// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::config::settings::AnalysisSettings;
use crate::domain::models::seo::{Industry, SeoAnalysisResult};
use crate::domain::services::llm_service::{LlmClient, LlmError};

const META_TITLE_MAX_CHARS: usize = 60;
const META_DESCRIPTION_MAX_CHARS: usize = 160;

const SYSTEM_PROMPT: &str =
    "You are an SEO analyst. You read website content and answer with a single valid JSON object.";

/// 内容分析错误
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Content too short for analysis: {actual} chars (minimum {minimum})")]
    ContentTooShort { actual: usize, minimum: usize },
    #[error("Could not parse model response: {0}")]
    UnparsableResponse(String),
    #[error("Model not configured: {0}")]
    NotConfigured(String),
    #[error(transparent)]
    Llm(LlmError),
}

impl From<LlmError> for AnalysisError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::NotConfigured(msg) => AnalysisError::NotConfigured(msg),
            other => AnalysisError::Llm(other),
        }
    }
}

impl AnalysisError {
    pub fn is_retryable(&self) -> bool {
        match self {
            AnalysisError::Llm(e) => e.is_retryable(),
            _ => false,
        }
    }
}

/// SEO分析服务
///
/// 将聚合后的站点文本交给模型，返回经过清洗的关键词、地区、行业和元信息
pub struct AnalysisService {
    llm: Arc<dyn LlmClient>,
    settings: AnalysisSettings,
}

impl AnalysisService {
    pub fn new(llm: Arc<dyn LlmClient>, settings: AnalysisSettings) -> Self {
        Self { llm, settings }
    }

    #[instrument(skip(self, text), fields(chars = text.chars().count()))]
    pub async fn analyze(&self, text: &str) -> Result<SeoAnalysisResult, AnalysisError> {
        let actual = text.trim().chars().count();
        if actual < self.settings.min_content_length {
            return Err(AnalysisError::ContentTooShort {
                actual,
                minimum: self.settings.min_content_length,
            });
        }

        let content = truncate_chars(text, self.settings.max_content_length);
        let prompt = build_prompt(content);

        let completion = self.llm.complete(SYSTEM_PROMPT, &prompt).await?;
        debug!("Model used {} tokens", completion.usage.total_tokens);

        let raw = extract_json_object(&completion.content).ok_or_else(|| {
            AnalysisError::UnparsableResponse("no JSON object in model response".to_string())
        })?;
        let value: Value = serde_json::from_str(raw)
            .map_err(|e| AnalysisError::UnparsableResponse(e.to_string()))?;

        let result = sanitize(&value, self.settings.max_keywords);
        info!(
            "Analysis produced {} keywords, industry {}",
            result.keywords.len(),
            result.industry
        );
        Ok(result)
    }
}

fn build_prompt(content: &str) -> String {
    let industries: Vec<&str> = Industry::ALL.iter().map(|i| i.as_str()).collect();
    format!(
        "Analyze the following website content and respond with ONLY a JSON object with these keys:\n\
         - \"keywords\": array of up to 10 search keywords this business should rank for\n\
         - \"location\": the primary city or region the business serves, or null\n\
         - \"industry\": one of [{}]\n\
         - \"metaTitle\": an SEO page title of at most 60 characters\n\
         - \"metaDescription\": an SEO meta description of at most 160 characters\n\n\
         Website content:\n{}",
        industries.join(", "),
        content
    )
}

/// 按字符截断，不会切断多字节字符
fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// 找到第一个括号平衡的 JSON 对象
///
/// 字符串字面量中的括号和转义字符不参与计数
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }

    None
}

fn string_field<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .find_map(|k| value.get(*k).and_then(Value::as_str))
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// 清洗模型输出，字段不合法时退化为默认值而不是报错
pub fn sanitize(value: &Value, max_keywords: usize) -> SeoAnalysisResult {
    let keywords = value
        .get("keywords")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .take(max_keywords)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let industry = string_field(value, &["industry"])
        .map(Industry::coerce)
        .unwrap_or_default();

    SeoAnalysisResult {
        keywords,
        location: string_field(value, &["location"]).map(str::to_string),
        industry,
        meta_title: string_field(value, &["metaTitle", "meta_title"])
            .map(|t| truncate_chars(t, META_TITLE_MAX_CHARS).to_string()),
        meta_description: string_field(value, &["metaDescription", "meta_description"])
            .map(|d| truncate_chars(d, META_DESCRIPTION_MAX_CHARS).to_string()),
        success: true,
        error: None,
    }
}
