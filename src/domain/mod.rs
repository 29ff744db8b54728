// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域层模块
///
/// 包含领域模型（models）、仓库接口（repositories）和领域服务（services），
/// 不依赖任何基础设施实现
pub mod models;
pub mod repositories;
pub mod services;
