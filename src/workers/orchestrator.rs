// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::job_record::{NormalizedRecord, RawRecord};
use crate::domain::models::scrape_run::{RunSummary, ScrapeRun};
use crate::domain::models::source_config::{HttpMethod, SourceConfig};
use crate::domain::repositories::job_repository::{JobSink, StoreOutcome};
use crate::domain::repositories::source_config_repository::SourceConfigRepository;
use crate::domain::services::notification_service::{
    AdminNotifier, Notification, NotificationReason,
};
use crate::engines::error_classifier::RecoveryAction;
use crate::engines::extractor::Extractor;
use crate::engines::fetcher::{FetchRequest, Fetcher};
use crate::engines::health_monitor::{HealthDirectives, HealthMonitor};
use crate::engines::rate_limiter::RateLimitingConfig;
use crate::engines::traits::EngineError;
use crate::utils::errors::RepositoryError;
use crate::workers::pipeline::{NormalizationPipeline, PipelineConfig};
use futures::stream::{self, StreamExt};
use metrics::{counter, gauge, histogram};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

/// 编排器配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    pub max_concurrent_sources: usize,
    /// 单个数据源的硬超时
    pub source_timeout_secs: u64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_concurrent_sources: 4,
            source_timeout_secs: 3600,
        }
    }
}

/// 编排器错误
#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("Source not found: {0}")]
    SourceNotFound(String),
    #[error("Source store error: {0}")]
    Repository(#[from] RepositoryError),
}

/// 编排器依赖的协作方
pub struct OrchestratorDeps {
    pub sources: Arc<dyn SourceConfigRepository>,
    pub fetcher: Arc<Fetcher>,
    pub pipeline: Arc<NormalizationPipeline>,
    pub health: Arc<HealthMonitor>,
    pub sink: Arc<dyn JobSink>,
    pub notifier: Arc<dyn AdminNotifier>,
}

/// 编排器
///
/// 并发运行各数据源（上限 `max_concurrent_sources`），单个数据源的失败不影响其他数据源
pub struct Orchestrator {
    config: OrchestratorConfig,
    rate_limiting: RateLimitingConfig,
    deps: OrchestratorDeps,
    run_lock: Mutex<()>,
}

/// 批次间的反压状态
#[derive(Debug, Clone, PartialEq)]
struct Backpressure {
    batch_size: usize,
    delay: Duration,
}

impl Backpressure {
    fn new(config: &PipelineConfig) -> Self {
        Self {
            batch_size: config.batch_size.max(1),
            delay: Duration::from_millis(config.base_delay_ms),
        }
    }

    /// 按指令缩小批次、加大间隔，均以配置的边界为限
    fn apply(&mut self, directives: &HealthDirectives, config: &PipelineConfig) {
        if directives.reduce_batch {
            let reduced = (self.batch_size as f64 * config.batch_reduction_factor) as usize;
            self.batch_size = reduced.max(config.min_batch_size).max(1);
        }
        if directives.increase_delay {
            self.delay = (self.delay + Duration::from_millis(config.delay_increment_ms))
                .min(Duration::from_millis(config.max_delay_ms));
        }
    }
}

impl Orchestrator {
    pub fn new(
        config: OrchestratorConfig,
        rate_limiting: RateLimitingConfig,
        deps: OrchestratorDeps,
    ) -> Self {
        Self {
            config,
            rate_limiting,
            deps,
            run_lock: Mutex::new(()),
        }
    }

    /// 运行全部启用的数据源
    pub async fn run_all(&self) -> Result<RunSummary, OrchestratorError> {
        let _guard = self.run_lock.lock().await;
        self.run_all_locked().await
    }

    /// 运行全部数据源，已有运行进行中时返回 `None`
    pub async fn try_run_all(&self) -> Option<Result<RunSummary, OrchestratorError>> {
        let _guard = self.run_lock.try_lock().ok()?;
        Some(self.run_all_locked().await)
    }

    async fn run_all_locked(&self) -> Result<RunSummary, OrchestratorError> {
        let started = Instant::now();
        let sources = self.deps.sources.list_enabled().await?;
        info!(count = sources.len(), "Starting run for all sources");

        let runs: Vec<ScrapeRun> = stream::iter(sources)
            .map(|source| async move { self.run_source(&source).await })
            .buffer_unordered(self.config.max_concurrent_sources.max(1))
            .collect()
            .await;

        let summary = RunSummary::from_runs(runs, started.elapsed().as_secs_f64());
        info!(
            sources_total = summary.sources_total,
            sources_succeeded = summary.sources_succeeded,
            sources_failed = summary.sources_failed,
            records_total = summary.records_total,
            records_new = summary.records_new,
            duration_seconds = summary.duration_seconds,
            "Run finished"
        );
        Ok(summary)
    }

    /// 运行单个数据源（即使该数据源未启用）
    pub async fn run_one(&self, source_id: &str) -> Result<RunSummary, OrchestratorError> {
        let source = self
            .deps
            .sources
            .find_by_id(source_id)
            .await?
            .ok_or_else(|| OrchestratorError::SourceNotFound(source_id.to_string()))?;

        let started = Instant::now();
        let run = self.run_source(&source).await;
        Ok(RunSummary::from_runs(vec![run], started.elapsed().as_secs_f64()))
    }

    /// 在硬超时内抓取一个数据源并关闭其运行记录
    #[instrument(skip(self, source), fields(source = %source.id))]
    pub async fn run_source(&self, source: &SourceConfig) -> ScrapeRun {
        self.deps
            .fetcher
            .resources()
            .limiter
            .register(&source.id, self.rate_limiting.limit_for_class(&source.rate_class));

        let mut run = ScrapeRun::start(&source.id);
        let timeout = Duration::from_secs(self.config.source_timeout_secs);
        let failure = match tokio::time::timeout(timeout, self.scrape_source(source, &mut run)).await
        {
            Ok(Ok(())) => None,
            Ok(Err(err)) => {
                let reason = if err.is_terminal() {
                    NotificationReason::FailureThreshold
                } else {
                    NotificationReason::RunFailed
                };
                Some((reason, err.to_string()))
            }
            Err(_) => Some((
                NotificationReason::RunFailed,
                format!("timed out after {}s", timeout.as_secs()),
            )),
        };

        match failure {
            None => run.complete(),
            Some((reason, summary)) => {
                run.fail(summary.clone());
                error!(run_id = %run.id, error = %summary, "Source run failed");
                self.notify(Notification::new(&source.id, run.id, reason, summary))
                    .await;
            }
        }

        counter!("scrape_runs_total", "status" => run.status.as_str()).increment(1);
        histogram!("scrape_run_duration_seconds").record(run.duration_seconds());
        info!(
            run_id = %run.id,
            status = run.status.as_str(),
            found = run.found,
            new = run.new,
            errors = run.errors,
            "Source run closed"
        );
        run
    }

    async fn scrape_source(&self, source: &SourceConfig, run: &mut ScrapeRun) -> Result<(), EngineError> {
        let selectors = source.resolve_selectors();
        let extractor = Extractor::new(&selectors.listing, &source.base_url, &source.id);
        let mut backpressure = Backpressure::new(self.deps.pipeline.config());

        for page in 0..source.pagination.max_pages.max(1) {
            let (url, payload) = page_request(source, page)?;
            let content = match self
                .deps
                .fetcher
                .fetch(&FetchRequest::listing(source, url.clone(), payload))
                .await
            {
                Ok(content) => content,
                Err(err) if err.is_terminal() || page == 0 => return Err(err),
                Err(err) => {
                    // Keep what earlier pages produced.
                    warn!(page, url = %url, error = %err, "Stopping pagination after fetch failure");
                    run.errors += 1;
                    break;
                }
            };

            let classifier = &self.deps.fetcher.resources().classifier;
            let records = match extractor.extract_listing(&content) {
                Ok(records) => {
                    classifier.record_parsed(&source.id);
                    records
                }
                Err(err) => {
                    run.errors += 1;
                    match classifier.handle(&err, &source.id).await {
                        RecoveryAction::Stop => {
                            return Err(EngineError::SourceHalted {
                                source_key: source.id.clone(),
                                kind: err.kind(),
                            })
                        }
                        RecoveryAction::Continue => {
                            warn!(page, url = %url, error = %err, "Skipping unparseable page");
                            continue;
                        }
                    }
                }
            };

            if records.is_empty() {
                debug!(page, "Empty page, pagination finished");
                break;
            }
            run.found += records.len() as u64;
            self.process_records(source, run, records, &mut backpressure)
                .await;
        }
        Ok(())
    }

    /// 按批处理：批次串行，每批结束后检查健康状态并执行指令
    async fn process_records(
        &self,
        source: &SourceConfig,
        run: &mut ScrapeRun,
        mut records: Vec<RawRecord>,
        backpressure: &mut Backpressure,
    ) {
        while !records.is_empty() {
            let take = backpressure.batch_size.min(records.len());
            let batch: Vec<RawRecord> = records.drain(..take).collect();
            gauge!("pipeline_batch_size", "source" => source.id.clone()).set(take as f64);

            let outcome = self.deps.pipeline.process_batch(source, batch).await;
            run.errors += outcome.dropped.len() as u64;
            let processed = outcome.processed();
            let dropped = outcome.dropped.len() as u64;
            self.persist(run, outcome.records).await;

            let directives = self.deps.health.check_health(processed, dropped);
            self.apply_directives(source, directives, backpressure);
            if !backpressure.delay.is_zero() {
                tokio::time::sleep(backpressure.delay).await;
            }
        }
    }

    fn apply_directives(
        &self,
        source: &SourceConfig,
        directives: HealthDirectives,
        backpressure: &mut Backpressure,
    ) {
        if directives.is_nominal() {
            return;
        }

        if directives.run_gc {
            let purged = self.deps.fetcher.resources().cache.purge_expired()
                + self.deps.pipeline.purge_expired();
            debug!(purged, "Purged expired cache entries");
        }
        backpressure.apply(&directives, self.deps.pipeline.config());

        warn!(
            source = %source.id,
            batch_size = backpressure.batch_size,
            delay_ms = backpressure.delay.as_millis() as u64,
            run_gc = directives.run_gc,
            "Applied health directives"
        );
    }

    /// 按业务单元分组后交给持久化协作方，失败只记录日志
    async fn persist(&self, run: &mut ScrapeRun, records: Vec<NormalizedRecord>) {
        let mut by_unit: BTreeMap<String, Vec<NormalizedRecord>> = BTreeMap::new();
        for record in records {
            by_unit
                .entry(record.business_unit.clone())
                .or_default()
                .push(record);
        }

        for (unit, records) in by_unit {
            debug!(unit = %unit, count = records.len(), "Persisting records");
            for record in &records {
                match self.deps.sink.store(record, &unit, run.id).await {
                    Ok(StoreOutcome::Inserted) => run.new += 1,
                    Ok(StoreOutcome::Duplicate) => {}
                    Err(err) => {
                        warn!(url = %record.url, unit = %unit, error = %err, "Failed to persist record")
                    }
                }
            }
        }
    }

    async fn notify(&self, notification: Notification) {
        if let Err(err) = self.deps.notifier.notify(&notification).await {
            warn!(source = %notification.source_id, error = %err, "Admin notification failed");
        }
    }
}

/// 第 `index` 页的请求URL与请求体
///
/// 只有一页时原样使用 `base_url` 与 `payload`
pub fn page_request(
    source: &SourceConfig,
    index: u32,
) -> Result<(String, Option<Value>), EngineError> {
    let pagination = &source.pagination;
    let paginate = pagination.max_pages > 1;
    let value = pagination.value_for(index);

    match source.method {
        HttpMethod::Get => {
            if !paginate {
                return Ok((source.base_url.clone(), None));
            }
            let mut url = Url::parse(&source.base_url)
                .map_err(|e| EngineError::Parse(format!("Invalid base url {}: {}", source.base_url, e)))?;
            let retained: Vec<(String, String)> = url
                .query_pairs()
                .filter(|(key, _)| key != pagination.param.as_str())
                .map(|(key, value)| (key.into_owned(), value.into_owned()))
                .collect();
            url.query_pairs_mut()
                .clear()
                .extend_pairs(retained)
                .append_pair(&pagination.param, &value.to_string());
            Ok((url.to_string(), None))
        }
        HttpMethod::Post => {
            let mut payload = source.payload.clone().unwrap_or_else(|| json!({}));
            if paginate {
                if let Value::Object(map) = &mut payload {
                    map.insert(pagination.param.clone(), json!(value));
                }
            }
            Ok((source.base_url.clone(), Some(payload)))
        }
    }
}
