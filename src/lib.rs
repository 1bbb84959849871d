// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 配置模块
///
/// 处理应用程序的配置设置和环境变量
pub mod config;

/// 领域模块
///
/// 包含招聘信息的核心实体、服务和仓库接口
pub mod domain;

/// 引擎模块
///
/// 实现页面获取、抽取以及身份、代理、限流和错误恢复
pub mod engines;

/// 基础设施模块
///
/// 提供外部协作方集成，如缓存、指标、持久化与通知
pub mod infrastructure;

/// 表示层模块
///
/// 处理HTTP请求和响应，用于手动触发运行
pub mod presentation;

/// 工具模块
///
/// 提供通用的工具函数和辅助功能
pub mod utils;

/// 工作器模块
///
/// 实现标准化流水线、编排器与定时调度
pub mod workers;
