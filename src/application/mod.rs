// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 应用程序模块
///
/// 请求DTO与用例，衔接HTTP层和领域层
pub mod dto;
pub mod use_cases;
