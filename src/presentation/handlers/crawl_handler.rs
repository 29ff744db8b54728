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
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    application::{
        dto::crawl_request::{CrawlAcceptedDto, CrawlRequestDto},
        use_cases::crawl_use_case::{CrawlUseCase, CrawlUseCaseError},
    },
    presentation::{errors::AppError, middleware::auth_middleware::CallerId},
};

/// 开始爬取，返回 202 和运行ID
pub async fn create_crawl(
    Extension(use_case): Extension<Arc<CrawlUseCase>>,
    Extension(caller): Extension<CallerId>,
    payload: Result<Json<CrawlRequestDto>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;
    let run_id = use_case.start_crawl(&caller.0, payload).await?;
    Ok((StatusCode::ACCEPTED, Json(CrawlAcceptedDto { run_id })))
}

/// 查询运行状态
///
/// 失败的运行同样返回 200，状态为 `failed`
pub async fn get_crawl(
    Extension(use_case): Extension<Arc<CrawlUseCase>>,
    Extension(caller): Extension<CallerId>,
    Path(run_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let run_id = Uuid::parse_str(&run_id).map_err(|_| CrawlUseCaseError::NotFound)?;
    let report = use_case.get_status(&caller.0, run_id).await?;
    Ok(Json(report))
}
