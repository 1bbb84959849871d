// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 缓存模块
///
/// 进程内有界TTL缓存，用于页面内容与派生分析结果
pub mod content_cache;
