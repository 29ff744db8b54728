// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// 爬取请求
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CrawlRequestDto {
    /// 站点地址，可省略协议
    #[validate(length(min = 1, message = "url is required"))]
    pub url: String,
    /// 结果归属的客户
    #[validate(length(min = 1, message = "clientId is required"))]
    pub client_id: String,
    /// 抓取提供方，缺省时使用配置的默认值
    #[serde(default)]
    pub provider: Option<String>,
    /// 请求的页面数，任意数值都会被限制到允许范围
    #[serde(default)]
    pub max_pages: Option<f64>,
}

/// 爬取请求已受理
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlAcceptedDto {
    pub run_id: Uuid,
}
