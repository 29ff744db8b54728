// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 仓库接口模块
///
/// 领域层的持久化抽象，具体实现位于基础设施层：
/// - 工作流运行仓库（workflow_run_repository）：运行记录与步骤日志
/// - SEO设置仓库（seo_settings_repository）：按客户保存的分析结果
pub mod seo_settings_repository;
pub mod workflow_run_repository;
