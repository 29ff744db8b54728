// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

use crate::application::use_cases::crawl_use_case::CrawlUseCaseError;

/// 应用错误类型
///
/// 封装处理器中的错误，统一输出 `{ "error": ... }` 响应体
#[derive(Debug)]
pub struct AppError(anyhow::Error);

impl AppError {
    fn status(&self) -> StatusCode {
        if let Some(err) = self.0.downcast_ref::<CrawlUseCaseError>() {
            return match err {
                CrawlUseCaseError::ValidationError(_) => StatusCode::BAD_REQUEST,
                CrawlUseCaseError::NotFound => StatusCode::NOT_FOUND,
                CrawlUseCaseError::Repository(_) | CrawlUseCaseError::StartFailed(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            };
        }

        if self.0.downcast_ref::<JsonRejection>().is_some() {
            return StatusCode::BAD_REQUEST;
        }

        StatusCode::INTERNAL_SERVER_ERROR
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_message = self.0.to_string();
        if status.is_server_error() {
            error!("Request failed: {}", error_message);
        }

        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
