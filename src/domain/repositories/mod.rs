// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 仓库接口模块
///
/// 该模块定义了领域层依赖的外部协作方接口，具体实现由基础设施层提供：
/// - 数据源配置仓库（source_config_repository）：只读的数据源配置存储
/// - 职位仓库（job_repository）：接收规范化记录的持久化协作方
pub mod job_repository;
pub mod source_config_repository;
