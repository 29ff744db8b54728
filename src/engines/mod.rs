// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

pub mod batch;
pub mod factory;
pub mod firecrawl_engine;
pub mod reader_engine;
pub mod traits;
pub mod validators;
