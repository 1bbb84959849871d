// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use jobrs::domain::models::source_config::SourceConfig;
use jobrs::domain::services::business_unit_classifier::{BusinessUnitClassifier, BusinessUnitConfig};
use jobrs::domain::services::job_analyzer::HeuristicAnalyzer;
use jobrs::domain::services::notification_service::{AdminNotifier, Notification};
use jobrs::domain::services::text_enricher::{
    EnrichedFields, EnrichmentContext, EnrichmentError, TextEnricher,
};
use jobrs::engines::browser_engine::BrowserEngine;
use jobrs::engines::browser_session::{BrowserSession, BrowserSettings};
use jobrs::engines::error_classifier::{ErrorClassifier, ErrorClassifierConfig, KindBackoff};
use jobrs::engines::fetcher::{FetchResources, Fetcher, FetcherConfig};
use jobrs::engines::health_monitor::{HealthConfig, HealthMonitor, ResourceProbe, ResourceSample};
use jobrs::engines::identity_rotator::{IdentityConfig, IdentityRotator};
use jobrs::engines::proxy_rotator::{ProxyConfig, ProxyRotator};
use jobrs::engines::rate_limiter::{RateLimit, RateLimiter, RateLimitingConfig};
use jobrs::engines::reqwest_engine::ReqwestEngine;
use jobrs::infrastructure::cache::content_cache::{CacheConfig, ContentCache};
use jobrs::infrastructure::repositories::memory_job_sink::MemoryJobSink;
use jobrs::infrastructure::repositories::yaml_source_repo::YamlSourceRepository;
use jobrs::workers::orchestrator::{Orchestrator, OrchestratorConfig, OrchestratorDeps};
use jobrs::workers::pipeline::{NormalizationPipeline, PipelineConfig};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// 固定资源占用的探针
pub struct IdleProbe;

impl ResourceProbe for IdleProbe {
    fn sample(&self) -> ResourceSample {
        ResourceSample::default()
    }
}

/// 返回固定采样并记录采样次数
pub struct FixedLoad {
    pub sample: ResourceSample,
    pub calls: AtomicUsize,
}

impl FixedLoad {
    pub fn new(memory_ratio: f64, cpu_ratio: f64) -> Self {
        Self {
            sample: ResourceSample {
                memory_ratio,
                cpu_ratio,
            },
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ResourceProbe for FixedLoad {
    fn sample(&self) -> ResourceSample {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.sample
    }
}

/// 记录所有通知的协作方
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<Notification>>,
}

#[async_trait]
impl AdminNotifier for RecordingNotifier {
    async fn notify(&self, notification: &Notification) -> anyhow::Result<()> {
        self.sent.lock().push(notification.clone());
        Ok(())
    }
}

/// 返回固定描述的补全服务
pub struct FixedEnricher(pub &'static str);

#[async_trait]
impl TextEnricher for FixedEnricher {
    async fn fill(&self, _context: &EnrichmentContext) -> Result<EnrichedFields, EnrichmentError> {
        Ok(EnrichedFields {
            description: self.0.to_string(),
            skills: vec!["excel".to_string()],
        })
    }
}

fn no_backoff() -> KindBackoff {
    KindBackoff {
        connection: [0, 0],
        parsing: [0, 0],
        rate_limit: [0, 0],
        timeout: [0, 0],
        unknown: [0, 0],
    }
}

/// 不退避的错误分类配置
pub fn classifier_config() -> ErrorClassifierConfig {
    ErrorClassifierConfig {
        backoff_ms: no_backoff(),
        ..ErrorClassifierConfig::default()
    }
}

/// 适合测试的抓取器：一次重试，无退避，宽松限流
pub fn test_fetcher(classifier: ErrorClassifierConfig) -> Arc<Fetcher> {
    fetcher_with(fetcher_config(), classifier)
}

fn fetcher_config() -> FetcherConfig {
    FetcherConfig {
        max_retries: 1,
        request_timeout_secs: 5,
        ..FetcherConfig::default()
    }
}

fn fetcher_with(config: FetcherConfig, classifier: ErrorClassifierConfig) -> Arc<Fetcher> {
    let resources = FetchResources {
        cache: Arc::new(ContentCache::new(&CacheConfig::default())),
        identities: Arc::new(IdentityRotator::new(&IdentityConfig::default())),
        proxies: Arc::new(ProxyRotator::new(&ProxyConfig::default())),
        limiter: Arc::new(RateLimiter::new(RateLimit::new(1000, 1))),
        classifier: Arc::new(ErrorClassifier::new(classifier)),
    };
    let session = Arc::new(BrowserSession::new(BrowserSettings::default()));
    Arc::new(Fetcher::new(
        config,
        resources,
        Arc::new(ReqwestEngine),
        Arc::new(BrowserEngine::new(session)),
    ))
}

/// 测试编排器的可调参数
pub struct TestAppOptions {
    pub classifier: ErrorClassifierConfig,
    pub orchestrator: OrchestratorConfig,
    pub pipeline: PipelineConfig,
    pub fetcher: FetcherConfig,
    pub sampler: Arc<dyn ResourceProbe>,
}

impl Default for TestAppOptions {
    fn default() -> Self {
        Self {
            classifier: classifier_config(),
            orchestrator: OrchestratorConfig {
                max_concurrent_sources: 2,
                source_timeout_secs: 30,
            },
            pipeline: PipelineConfig {
                delay_increment_ms: 0,
                ..PipelineConfig::default()
            },
            fetcher: fetcher_config(),
            sampler: Arc::new(IdleProbe),
        }
    }
}

pub struct TestApp {
    pub orchestrator: Arc<Orchestrator>,
    pub fetcher: Arc<Fetcher>,
    pub sink: Arc<MemoryJobSink>,
    pub notifier: Arc<RecordingNotifier>,
}

/// 组装一个以内存协作方为后端的编排器
pub fn test_app(sources: Vec<SourceConfig>, classifier: ErrorClassifierConfig) -> TestApp {
    test_app_with(
        sources,
        TestAppOptions {
            classifier,
            ..TestAppOptions::default()
        },
    )
}

pub fn test_app_with(sources: Vec<SourceConfig>, options: TestAppOptions) -> TestApp {
    let fetcher = fetcher_with(options.fetcher, options.classifier);
    let business_units =
        BusinessUnitClassifier::from_config(&BusinessUnitConfig::default()).unwrap();
    let pipeline = Arc::new(NormalizationPipeline::new(
        options.pipeline,
        Arc::new(FixedEnricher(
            "Coordinate inbound logistics and inventory for the regional warehouse.",
        )),
        Arc::new(HeuristicAnalyzer),
        fetcher.clone(),
        Arc::new(business_units),
        &CacheConfig::default(),
    ));
    let sink = Arc::new(MemoryJobSink::new());
    let notifier = Arc::new(RecordingNotifier::default());

    let orchestrator = Orchestrator::new(
        options.orchestrator,
        RateLimitingConfig {
            default: RateLimit::new(1000, 1),
            ..RateLimitingConfig::default()
        },
        OrchestratorDeps {
            sources: Arc::new(YamlSourceRepository::from_sources(sources)),
            fetcher: fetcher.clone(),
            pipeline,
            health: Arc::new(HealthMonitor::new(HealthConfig::default(), options.sampler)),
            sink: sink.clone(),
            notifier: notifier.clone(),
        },
    );

    TestApp {
        orchestrator: Arc::new(orchestrator),
        fetcher,
        sink,
        notifier,
    }
}

/// 通用平台的数据源
pub fn generic_source(id: &str, base_url: &str) -> SourceConfig {
    serde_yaml::from_str(&format!(
        "{{ id: {}, base_url: '{}', platform: generic }}",
        id, base_url
    ))
    .unwrap()
}

pub struct Posting<'a> {
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub location: Option<&'a str>,
    pub href: Option<&'a str>,
}

impl<'a> Posting<'a> {
    pub fn new(title: &'a str, description: &'a str, href: &'a str) -> Self {
        Self {
            title,
            description: Some(description),
            location: Some("Monterrey, NL"),
            href: Some(href),
        }
    }
}

/// 渲染一页通用平台的列表
pub fn listing_page(postings: &[Posting<'_>]) -> String {
    let items: String = postings
        .iter()
        .map(|posting| {
            let description = posting
                .description
                .map(|d| format!("<p>{}</p>", d))
                .unwrap_or_default();
            let location = posting
                .location
                .map(|l| format!("<span class=\"location\">{}</span>", l))
                .unwrap_or_default();
            let title = match posting.href {
                Some(href) => format!("<h2><a href=\"{}\">{}</a></h2>", href, posting.title),
                None => format!("<h2>{}</h2>", posting.title),
            };
            format!(
                "<article>{}{}{}<span class=\"company\">ACME</span></article>",
                title, description, location
            )
        })
        .collect();
    format!("<html><body><main>{}</main></body></html>", items)
}
