// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 数据库实体模块
///
/// 使用SeaORM定义运行、步骤和客户SEO设置三张表
pub mod seo_settings;
pub mod workflow_run;
pub mod workflow_step;
