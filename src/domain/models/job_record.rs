// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;
use validator::Validate;

/// 列表页直接抽取的原始记录
///
/// 字段可能缺失或为占位值，只被规范化流水线消费一次
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct RawRecord {
    pub source_id: String,
    #[validate(required, length(min = 1))]
    pub title: Option<String>,
    #[validate(required, length(min = 1))]
    pub description: Option<String>,
    #[validate(required, length(min = 1))]
    pub location: Option<String>,
    #[validate(required, length(min = 1))]
    pub company: Option<String>,
    pub posted_date: Option<String>,
    #[validate(required, url)]
    pub url: Option<String>,
}

impl RawRecord {
    /// 日志中用于标识记录的简短描述
    pub fn label(&self) -> String {
        match (&self.title, &self.url) {
            (Some(title), Some(url)) => format!("{} <{}>", title, url),
            (Some(title), None) => title.clone(),
            (None, Some(url)) => url.clone(),
            (None, None) => "<untitled>".to_string(),
        }
    }

    /// 校验后仍缺失的必填字段
    pub fn missing_required_fields(&self) -> Vec<String> {
        match self.validate() {
            Ok(()) => Vec::new(),
            Err(errors) => {
                let mut fields: Vec<String> = errors
                    .field_errors()
                    .keys()
                    .map(|field| field.to_string())
                    .collect();
                fields.sort();
                fields
            }
        }
    }
}

/// 薪资范围
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SalaryRange {
    pub min: f64,
    pub max: f64,
}

impl SalaryRange {
    pub fn new(min: f64, max: f64) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    pub fn midpoint(&self) -> f64 {
        (self.min + self.max) / 2.0
    }
}

/// 雇佣类型
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobClassification {
    FullTime,
    PartTime,
    Contract,
    Internship,
    Temporary,
    #[default]
    Unspecified,
}

/// 文本分析得到的职位特征
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobAnalysis {
    pub category: String,
    pub entities: Vec<String>,
    pub salary_estimate: Option<SalaryRange>,
    pub experience_years: Option<u32>,
    /// 要求复杂度 (0.0 - 1.0)
    pub complexity_score: f32,
    pub classification: JobClassification,
    pub remote: bool,
}

/// 行业类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Industry {
    Tech,
    Management,
    Operations,
    Strategy,
}

impl Industry {
    pub const ALL: [Industry; 4] = [
        Industry::Tech,
        Industry::Management,
        Industry::Operations,
        Industry::Strategy,
    ];
}

/// 规范化后的职位记录，生成后不可变
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    pub id: Uuid,
    pub source_id: String,
    pub title: String,
    pub description: String,
    pub location: String,
    pub company: String,
    pub url: String,
    pub posted_date: Option<String>,
    pub skills: Vec<String>,
    pub skill_categories: BTreeMap<String, Vec<String>>,
    pub analysis: JobAnalysis,
    pub industry: Option<Industry>,
    pub business_unit: String,
    pub normalized_at: DateTime<Utc>,
}

/// 记录被丢弃的原因
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "code", rename_all = "kebab-case")]
pub enum DropReason {
    MissingRequiredField { fields: Vec<String> },
    EnrichmentFailed { message: String },
}

impl DropReason {
    /// 原因代码
    pub fn code(&self) -> &'static str {
        match self {
            DropReason::MissingRequiredField { .. } => "missing-required-field",
            DropReason::EnrichmentFailed { .. } => "enrichment-failed",
        }
    }
}

impl std::fmt::Display for DropReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DropReason::MissingRequiredField { fields } => {
                write!(f, "{}: {}", self.code(), fields.join(", "))
            }
            DropReason::EnrichmentFailed { message } => write!(f, "{}: {}", self.code(), message),
        }
    }
}

/// 流水线阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Clean,
    Enrich,
    Validate,
    Classify,
}

/// 被丢弃的记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DroppedRecord {
    pub label: String,
    pub stage: PipelineStage,
    pub reason: DropReason,
}
