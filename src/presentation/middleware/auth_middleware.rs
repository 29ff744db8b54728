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

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::Response,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::settings::AuthSettings;

/// 已认证的调用方标识
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerId(pub String);

/// 认证状态
#[derive(Clone, Default)]
pub struct AuthState {
    /// API密钥到调用方标识的映射
    pub api_keys: Arc<HashMap<String, String>>,
}

impl AuthState {
    pub fn from_settings(settings: &AuthSettings) -> Self {
        Self {
            api_keys: Arc::new(settings.api_keys.clone()),
        }
    }

    pub fn caller_for(&self, token: &str) -> Option<&str> {
        self.api_keys.get(token).map(String::as_str)
    }
}

/// 认证中间件
///
/// 验证 `Authorization: Bearer <key>`，成功后在请求扩展中放入 `CallerId`
///
/// # 返回值
///
/// * `Ok(Response)` - 认证成功的响应
/// * `Err(StatusCode)` - 缺少或未知的密钥返回 401
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let path = req.uri().path();
    debug!("AuthMiddleware processing path: {}", path);
    if path == "/health" || path == "/v1/version" {
        return Ok(next.run(req).await);
    }

    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .ok_or(StatusCode::UNAUTHORIZED)?;

    match state.caller_for(token) {
        Some(caller) => {
            let caller = CallerId(caller.to_string());
            req.extensions_mut().insert(caller);
            Ok(next.run(req).await)
        }
        None => {
            warn!("Rejected request with unknown API key");
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}
