// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 工作器模块
///
/// - 规范化流水线（pipeline）：清洗、特征、校验与分类
/// - 编排器（orchestrator）：并发运行数据源并执行反压指令
/// - 调度器（scheduler）：定时触发全部数据源的运行
pub mod orchestrator;
pub mod pipeline;
pub mod scheduler;
