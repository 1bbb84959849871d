// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域服务模块
///
/// 该模块包含规范化与分类的核心业务规则：
/// - 业务单元分类（business_unit_classifier）：确定性的加权评分
/// - 职位分析（job_analyzer）：类别、实体、薪资、经验年限与复杂度
/// - LLM服务（llm_service）：通过OpenAI兼容接口补全缺失描述
/// - 管理员通知（notification_service）：数据源失败时的通知接口
/// - 技能分类（skill_classifier）：技能规范化与类别归并
/// - 文本补全（text_enricher）：可替换的补全能力接口
pub mod business_unit_classifier;
pub mod job_analyzer;
pub mod llm_service;
pub mod notification_service;
pub mod skill_classifier;
pub mod text_enricher;
