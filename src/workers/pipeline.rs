// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::job_record::{
    DropReason, DroppedRecord, JobAnalysis, NormalizedRecord, PipelineStage, RawRecord,
};
use crate::domain::models::source_config::SourceConfig;
use crate::domain::services::business_unit_classifier::BusinessUnitClassifier;
use crate::domain::services::job_analyzer::JobAnalyzer;
use crate::domain::services::skill_classifier::{classify_skills, detect_terms};
use crate::domain::services::text_enricher::{EnrichmentContext, EnrichmentError, TextEnricher};
use crate::engines::fetcher::DetailFetcher;
use crate::infrastructure::cache::content_cache::{CacheConfig, ContentCache};
use crate::utils::text_processing::{clean_field, clean_text};
use chrono::Utc;
use futures::stream::{self, StreamExt};
use metrics::counter;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

/// 规范化流水线配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub batch_size: usize,
    pub min_batch_size: usize,
    /// `reduce_batch` 指令下批大小的乘数
    pub batch_reduction_factor: f64,
    /// 单批内并发处理的记录数
    pub record_concurrency: usize,
    pub description_word_target: u32,
    pub skill_count_target: u32,
    pub analysis_ttl_secs: u64,
    pub base_delay_ms: u64,
    pub delay_increment_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: 50,
            min_batch_size: 5,
            batch_reduction_factor: 0.5,
            record_concurrency: 8,
            description_word_target: 180,
            skill_count_target: 8,
            analysis_ttl_secs: 3600,
            base_delay_ms: 0,
            delay_increment_ms: 2000,
            max_delay_ms: 30000,
        }
    }
}

/// 一批记录的处理结果
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub records: Vec<NormalizedRecord>,
    pub dropped: Vec<DroppedRecord>,
}

impl BatchOutcome {
    pub fn processed(&self) -> u64 {
        (self.records.len() + self.dropped.len()) as u64
    }
}

/// 流水线中间态
struct Candidate {
    raw: RawRecord,
    /// 文本补全给出的技能
    generated_skills: Vec<String>,
}

/// 规范化流水线
///
/// 清洗 -> 特征 -> 校验（一次补救） -> 分类；单条记录的失败不会中断整批
pub struct NormalizationPipeline {
    config: PipelineConfig,
    enricher: Arc<dyn TextEnricher>,
    analyzer: Arc<dyn JobAnalyzer>,
    details: Arc<dyn DetailFetcher>,
    classifier: Arc<BusinessUnitClassifier>,
    analysis_cache: ContentCache<JobAnalysis>,
}

impl NormalizationPipeline {
    /// 创建流水线
    ///
    /// # 参数
    ///
    /// * `config` - 批大小、并发与补全目标
    /// * `enricher` - 缺失描述的补全能力
    /// * `analyzer` - 文本特征分析
    /// * `details` - 校验补救时的详情页获取
    /// * `classifier` - 业务单元分类器
    /// * `cache` - 分析结果缓存容量
    pub fn new(
        config: PipelineConfig,
        enricher: Arc<dyn TextEnricher>,
        analyzer: Arc<dyn JobAnalyzer>,
        details: Arc<dyn DetailFetcher>,
        classifier: Arc<BusinessUnitClassifier>,
        cache: &CacheConfig,
    ) -> Self {
        Self {
            config,
            enricher,
            analyzer,
            details,
            classifier,
            analysis_cache: ContentCache::new(cache),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// 清理过期的分析缓存
    pub fn purge_expired(&self) -> usize {
        self.analysis_cache.purge_expired()
    }

    /// 处理一批原始记录
    ///
    /// 批内记录并发处理（上限 `record_concurrency`），输出保持输入顺序
    pub async fn process_batch(&self, source: &SourceConfig, batch: Vec<RawRecord>) -> BatchOutcome {
        let results: Vec<Result<NormalizedRecord, DroppedRecord>> = stream::iter(batch)
            .map(|raw| self.process_record(source, raw))
            .buffered(self.config.record_concurrency.max(1))
            .collect()
            .await;

        let mut outcome = BatchOutcome::default();
        for result in results {
            match result {
                Ok(record) => {
                    counter!("records_normalized_total", "unit" => record.business_unit.clone())
                        .increment(1);
                    outcome.records.push(record);
                }
                Err(dropped) => {
                    warn!(
                        source = %source.id,
                        record = %dropped.label,
                        stage = ?dropped.stage,
                        reason = dropped.reason.code(),
                        detail = %dropped.reason,
                        "Record dropped"
                    );
                    counter!("records_dropped_total", "reason" => dropped.reason.code())
                        .increment(1);
                    outcome.dropped.push(dropped);
                }
            }
        }
        outcome
    }

    /// 处理单条记录
    pub async fn process_record(
        &self,
        source: &SourceConfig,
        raw: RawRecord,
    ) -> Result<NormalizedRecord, DroppedRecord> {
        let candidate = self.clean(source, raw).await?;
        let analysis = self.enrich(&candidate.raw);
        let (candidate, revised) = self.validate(source, candidate).await?;
        let analysis = if revised {
            self.reanalyze(&candidate.raw)
        } else {
            analysis
        };
        Ok(self.classify(candidate, analysis))
    }

    /// 清洗：去除标签与占位值，缺少标题或URL的记录直接丢弃，缺失描述时请求补全
    async fn clean(&self, source: &SourceConfig, raw: RawRecord) -> Result<Candidate, DroppedRecord> {
        let mut cleaned = RawRecord {
            source_id: source.id.clone(),
            title: clean_field(raw.title.as_deref()),
            description: clean_field(raw.description.as_deref()),
            location: clean_field(raw.location.as_deref()),
            company: clean_field(raw.company.as_deref()),
            posted_date: clean_field(raw.posted_date.as_deref()),
            url: clean_field(raw.url.as_deref()),
        };
        if cleaned.company.is_none() {
            cleaned.company = source.default_company.clone();
        }

        let missing: Vec<String> = [("title", &cleaned.title), ("url", &cleaned.url)]
            .into_iter()
            .filter(|(_, value)| value.is_none())
            .map(|(field, _)| field.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(DroppedRecord {
                label: raw.label(),
                stage: PipelineStage::Clean,
                reason: DropReason::MissingRequiredField { fields: missing },
            });
        }

        let mut candidate = Candidate {
            raw: cleaned,
            generated_skills: Vec::new(),
        };
        if candidate.raw.description.is_none() {
            // Failure here is not fatal; validation gets one more attempt.
            if let Err(err) = self.fill_description(&mut candidate).await {
                debug!(record = %candidate.raw.label(), error = %err, "Description backfill failed");
            }
        }
        Ok(candidate)
    }

    /// 特征：按 (url, title) 缓存的文本分析
    fn enrich(&self, raw: &RawRecord) -> JobAnalysis {
        let key = analysis_key(raw);
        if let Some(analysis) = self.analysis_cache.get(&key) {
            return analysis;
        }
        self.compute_analysis(&key, raw)
    }

    fn reanalyze(&self, raw: &RawRecord) -> JobAnalysis {
        let key = analysis_key(raw);
        self.analysis_cache.remove(&key);
        self.compute_analysis(&key, raw)
    }

    fn compute_analysis(&self, key: &str, raw: &RawRecord) -> JobAnalysis {
        let analysis = self.analyzer.analyze(
            raw.title.as_deref().unwrap_or_default(),
            raw.description.as_deref().unwrap_or_default(),
        );
        self.analysis_cache.set(
            key,
            analysis.clone(),
            Duration::from_secs(self.config.analysis_ttl_secs),
        );
        analysis
    }

    /// 校验：必填字段不全时先抓取详情页，再请求文本补全，仍不全则丢弃
    ///
    /// # 返回值
    ///
    /// 第二个值表示记录是否在补救中被修改
    async fn validate(
        &self,
        source: &SourceConfig,
        mut candidate: Candidate,
    ) -> Result<(Candidate, bool), DroppedRecord> {
        if candidate.raw.missing_required_fields().is_empty() {
            return Ok((candidate, false));
        }

        debug!(
            record = %candidate.raw.label(),
            missing = ?candidate.raw.missing_required_fields(),
            "Record incomplete, retrying enrichment"
        );

        if let Some(url) = candidate.raw.url.clone() {
            match self.details.fetch_detail(source, &url).await {
                Ok(detail) => merge_missing(&mut candidate.raw, detail),
                Err(err) => debug!(url = %url, error = %err, "Detail page fetch failed"),
            }
        }

        let mut enrichment_failure = None;
        if candidate.raw.description.is_none() {
            match self.fill_description(&mut candidate).await {
                Ok(()) | Err(EnrichmentError::Unavailable) => {}
                Err(err) => enrichment_failure = Some(err.to_string()),
            }
        }

        let missing = candidate.raw.missing_required_fields();
        if missing.is_empty() {
            return Ok((candidate, true));
        }

        let reason = match enrichment_failure {
            Some(message) if missing.iter().any(|field| field == "description") => {
                DropReason::EnrichmentFailed { message }
            }
            _ => DropReason::MissingRequiredField { fields: missing },
        };
        Err(DroppedRecord {
            label: candidate.raw.label(),
            stage: PipelineStage::Validate,
            reason,
        })
    }

    /// 分类：技能归类与业务单元分配
    fn classify(&self, candidate: Candidate, analysis: JobAnalysis) -> NormalizedRecord {
        let Candidate {
            raw,
            generated_skills,
        } = candidate;
        // Validation guarantees these fields are present.
        let title = raw.title.unwrap_or_default();
        let description = raw.description.unwrap_or_default();
        let location = raw.location.unwrap_or_default();

        let skills = classify_skills(&generated_skills, &format!("{} {}", title, description));
        let assignment = self.classifier.assign(
            &title,
            Some(&description),
            analysis.salary_estimate.as_ref(),
            analysis.experience_years,
            Some(&location),
        );

        NormalizedRecord {
            id: Uuid::new_v4(),
            source_id: raw.source_id,
            title,
            description,
            location,
            company: raw.company.unwrap_or_default(),
            url: raw.url.unwrap_or_default(),
            posted_date: raw.posted_date,
            skills: skills.skills,
            skill_categories: skills.categories,
            analysis,
            industry: assignment.industry,
            business_unit: assignment.unit,
            normalized_at: Utc::now(),
        }
    }

    async fn fill_description(&self, candidate: &mut Candidate) -> Result<(), EnrichmentError> {
        let raw = &candidate.raw;
        let context = EnrichmentContext {
            title: raw.title.clone().unwrap_or_default(),
            location: raw.location.clone(),
            company: raw.company.clone(),
            known_constraints: detect_terms(raw.title.as_deref().unwrap_or_default())
                .into_iter()
                .map(|term| format!("requires {}", term))
                .collect(),
            word_target: self.config.description_word_target,
            skill_target: self.config.skill_count_target,
        };

        let fields = self.enricher.fill(&context).await?;
        let description = clean_text(&fields.description);
        if description.is_empty() {
            return Err(EnrichmentError::InvalidOutput("empty description".to_string()));
        }
        candidate.raw.description = Some(description);
        candidate.generated_skills = fields.skills;
        Ok(())
    }
}

fn analysis_key(raw: &RawRecord) -> String {
    ContentCache::<JobAnalysis>::key_for_parts(&[
        raw.url.as_deref().unwrap_or_default(),
        raw.title.as_deref().unwrap_or_default(),
    ])
}

/// 只补齐缺失字段，已有值保持不变
fn merge_missing(record: &mut RawRecord, detail: RawRecord) {
    fn fill(slot: &mut Option<String>, value: Option<String>) {
        if slot.is_none() {
            *slot = clean_field(value.as_deref());
        }
    }
    fill(&mut record.title, detail.title);
    fill(&mut record.description, detail.description);
    fill(&mut record.location, detail.location);
    fill(&mut record.company, detail.company);
    fill(&mut record.posted_date, detail.posted_date);
}

#[cfg(test)]
#[path = "pipeline_test.rs"]
mod tests;
