// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域模型模块
///
/// 该模块定义了系统的核心业务实体，包括：
/// - 数据源配置（source_config）：目标站点、平台选择器与分页参数
/// - 职位记录（job_record）：原始记录、分析特征与规范化记录
/// - 抓取运行（scrape_run）：单个数据源的一次运行及运行汇总
pub mod job_record;
pub mod scrape_run;
pub mod source_config;
