// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::{
    routing::{get, post},
    Extension, Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::application::use_cases::crawl_use_case::CrawlUseCase;
use crate::presentation::handlers::crawl_handler;
use crate::presentation::middleware::auth_middleware::{auth_middleware, AuthState};

/// 创建应用路由
///
/// `/health` 和 `/v1/version` 无需认证，其余路由需要API密钥
pub fn build_router(use_case: Arc<CrawlUseCase>, auth_state: AuthState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health_check))
        .route("/v1/version", get(version));

    let protected_routes = Router::new()
        .route("/v1/crawl", post(crawl_handler::create_crawl))
        .route("/v1/crawl/{run_id}", get(crawl_handler::get_crawl))
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            auth_middleware,
        ))
        .layer(Extension(use_case));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
}

/// 健康检查端点
pub async fn health_check() -> &'static str {
    "OK"
}

/// 版本信息端点
pub async fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
