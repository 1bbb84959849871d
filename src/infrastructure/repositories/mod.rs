// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 仓库实现模块
///
/// 提供领域仓库接口的具体实现：
/// - YAML数据源仓库（yaml_source_repo）
/// - HTTP持久化协作方（http_job_sink）
/// - 进程内持久化协作方（memory_job_sink）
pub mod http_job_sink;
pub mod memory_job_sink;
pub mod yaml_source_repo;
