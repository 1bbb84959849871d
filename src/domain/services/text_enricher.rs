// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 补全请求上下文
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnrichmentContext {
    pub title: String,
    pub location: Option<String>,
    pub company: Option<String>,
    /// 已知约束（如已抽取到的技能、雇佣类型）
    pub known_constraints: Vec<String>,
    pub word_target: u32,
    pub skill_target: u32,
}

/// 补全结果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichedFields {
    pub description: String,
    #[serde(default)]
    pub skills: Vec<String>,
}

/// 补全错误
#[derive(Error, Debug)]
pub enum EnrichmentError {
    /// 未配置补全能力
    #[error("Text enrichment is not configured")]
    Unavailable,
    /// 上游调用失败
    #[error("Text enrichment request failed: {0}")]
    Upstream(String),
    /// 返回内容无法解析
    #[error("Text enrichment returned invalid output: {0}")]
    InvalidOutput(String),
}

/// 文本补全能力
///
/// 只用于回填缺失字段，失败不会中断流水线
#[async_trait]
pub trait TextEnricher: Send + Sync {
    async fn fill(&self, context: &EnrichmentContext) -> Result<EnrichedFields, EnrichmentError>;
}

/// 未配置时使用的补全器
pub struct DisabledEnricher;

#[async_trait]
impl TextEnricher for DisabledEnricher {
    async fn fill(&self, _context: &EnrichmentContext) -> Result<EnrichedFields, EnrichmentError> {
        Err(EnrichmentError::Unavailable)
    }
}
