// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域模型模块
///
/// - 发现结果（discovery）：URL发现链的输出
/// - 页面（page）：抓取的页面内容与聚合结果
/// - SEO（seo）：行业枚举、分析结果与客户设置
/// - 工作流（workflow）：运行状态机与步骤记录
pub mod discovery;
pub mod page;
pub mod seo;
pub mod workflow;
