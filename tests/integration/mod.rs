// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

mod discovery_test;
mod helpers;
mod pipeline_test;
mod poller_test;
