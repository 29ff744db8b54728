// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::config::settings::LlmSettings;

/// 模型调用错误
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("LLM request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
    #[error("LLM API returned error: {status} - {message}")]
    Api { status: u16, message: String },
    #[error("Invalid response format from LLM API: {0}")]
    InvalidResponse(String),
    #[error("LLM not configured: {0}")]
    NotConfigured(String),
}

impl LlmError {
    /// 网络错误、限流和服务端错误可以重试
    pub fn is_retryable(&self) -> bool {
        match self {
            LlmError::RequestFailed(e) => {
                e.is_timeout()
                    || e.is_connect()
                    || e.status().map(|s| s.is_server_error()).unwrap_or(false)
            }
            LlmError::Api { status, .. } => *status == 429 || *status >= 500,
            LlmError::InvalidResponse(_) | LlmError::NotConfigured(_) => false,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// 一次补全的结果
#[derive(Debug, Clone, Default)]
pub struct LlmCompletion {
    pub content: String,
    pub usage: TokenUsage,
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, system: &str, prompt: &str) -> Result<LlmCompletion, LlmError>;
}

/// LLM服务 - 兼容 OpenAI chat-completions 接口的模型客户端
///
/// # 配置
///
/// - `llm.api_key` - API密钥，未设置时调用返回 `NotConfigured`
/// - `llm.model` - 模型名称
/// - `llm.api_base_url` - API基础URL
/// - `llm.timeout_secs` - 单次请求超时
pub struct LlmService {
    client: reqwest::Client,
    api_key: Option<String>,
    model: String,
    api_base_url: String,
}

impl LlmService {
    pub fn new(settings: &LlmSettings) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_key: settings.api_key.clone().filter(|k| !k.trim().is_empty()),
            model: settings.model.clone(),
            api_base_url: settings.api_base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl LlmClient for LlmService {
    async fn complete(&self, system: &str, prompt: &str) -> Result<LlmCompletion, LlmError> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| LlmError::NotConfigured("llm.api_key is not set".to_string()))?;

        let request_body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": prompt }
            ],
            "temperature": 0.0
        });

        let url = format!("{}/chat/completions", self.api_base_url);
        let response = self
            .client
            .post(url)
            .bearer_auth(api_key)
            .json(&request_body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(LlmError::Api { status, message });
        }

        let body: Value = response.json().await?;

        let usage = body
            .get("usage")
            .map(|u| TokenUsage {
                prompt_tokens: u["prompt_tokens"].as_u64().unwrap_or(0) as u32,
                completion_tokens: u["completion_tokens"].as_u64().unwrap_or(0) as u32,
                total_tokens: u["total_tokens"].as_u64().unwrap_or(0) as u32,
            })
            .unwrap_or_default();

        let content = body["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| LlmError::InvalidResponse("missing choices[0].message.content".into()))?
            .to_string();

        debug!(
            "LLM completion received: {} chars, {} tokens",
            content.len(),
            usage.total_tokens
        );

        Ok(LlmCompletion { content, usage })
    }
}
