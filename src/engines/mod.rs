// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

pub mod browser_engine;
pub mod browser_session;
pub mod error_classifier;
pub mod extractor;
pub mod fetcher;
pub mod health_monitor;
pub mod human_behavior;
pub mod identity_rotator;
pub mod proxy_rotator;
pub mod rate_limiter;
pub mod reqwest_engine;
pub mod traits;
