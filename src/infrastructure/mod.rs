// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 基础设施层模块
///
/// 该模块包含系统的技术实现细节，负责与外部系统的交互：
/// - 缓存（cache）：进程内有界TTL内容缓存
/// - 可观测性（observability）：Prometheus指标与进程资源探针
/// - 仓库实现（repositories）：数据源存储与持久化协作方的实现
/// - 服务实现（services）：管理员通知
///
/// 基础设施层依赖于领域层的抽象接口，确保领域层保持纯粹的业务逻辑。
pub mod cache;
pub mod observability;
pub mod repositories;
pub mod services;
