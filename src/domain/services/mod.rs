// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域服务模块
///
/// - 发现服务（discovery_service）：站点地图、robots.txt 与首页链接的发现链
/// - 页面优先级（priority）：按路径模式为页面排序
/// - 聚合服务（aggregation_service）：在字符预算内合并页面内容
/// - LLM服务（llm_service）：兼容 chat-completions 的模型客户端
/// - 分析服务（analysis_service）：模型提示、JSON提取与结果清洗
/// - 状态服务（status_service）：运行状态报告
pub mod aggregation_service;
pub mod analysis_service;
pub mod discovery_service;
pub mod llm_service;
pub mod priority;
pub mod status_service;
