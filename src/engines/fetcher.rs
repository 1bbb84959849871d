// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::job_record::RawRecord;
use crate::domain::models::source_config::{HttpMethod, SourceConfig};
use crate::engines::error_classifier::{ErrorClassifier, RecoveryAction};
use crate::engines::extractor::Extractor;
use crate::engines::identity_rotator::IdentityRotator;
use crate::engines::proxy_rotator::ProxyRotator;
use crate::engines::rate_limiter::RateLimiter;
use crate::engines::traits::{EngineError, ErrorKind, ScrapeRequest, ScraperEngine};
use crate::infrastructure::cache::content_cache::ContentCache;
use async_trait::async_trait;
use metrics::counter;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// 抓取器配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetcherConfig {
    /// 首次请求失败后的最大重试次数
    pub max_retries: u32,
    pub request_timeout_secs: u64,
    pub cache_ttl_secs: u64,
    pub detail_page_cache_ttl_secs: u64,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            request_timeout_secs: 30,
            cache_ttl_secs: 7200,
            detail_page_cache_ttl_secs: 3600,
        }
    }
}

/// 一次可获取的请求
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub url: String,
    pub method: HttpMethod,
    pub payload: Option<Value>,
    /// 限流与熔断使用的数据源标识
    pub source_key: String,
    /// 是否需要浏览器渲染
    pub render: bool,
    /// 覆盖默认缓存TTL
    pub cache_ttl: Option<Duration>,
}

impl FetchRequest {
    /// 数据源列表页请求
    pub fn listing(source: &SourceConfig, url: String, payload: Option<Value>) -> Self {
        Self {
            url,
            method: source.method,
            payload,
            source_key: source.id.clone(),
            render: source.needs_browser(),
            cache_ttl: None,
        }
    }
}

/// 由`Fetcher`共享的资源保护组件
#[derive(Clone)]
pub struct FetchResources {
    pub cache: Arc<ContentCache<String>>,
    pub identities: Arc<IdentityRotator>,
    pub proxies: Arc<ProxyRotator>,
    pub limiter: Arc<RateLimiter>,
    pub classifier: Arc<ErrorClassifier>,
}

/// 详情页获取能力
#[async_trait]
pub trait DetailFetcher: Send + Sync {
    /// 获取详情页并按详情选择器抽取字段
    async fn fetch_detail(&self, source: &SourceConfig, url: &str) -> Result<RawRecord, EngineError>;
}

/// 抓取器
///
/// 缓存 -> 身份与代理 -> 限流 -> 传输 -> 错误分类与重试 -> 写缓存
pub struct Fetcher {
    config: FetcherConfig,
    resources: FetchResources,
    http: Arc<dyn ScraperEngine>,
    browser: Arc<dyn ScraperEngine>,
}

impl Fetcher {
    /// 创建新的抓取器
    ///
    /// # 参数
    ///
    /// * `config` - 重试、超时与缓存配置
    /// * `resources` - 共享的缓存、轮换器、限流器和错误分类器
    /// * `http` - 普通请求传输
    /// * `browser` - 浏览器渲染传输
    pub fn new(
        config: FetcherConfig,
        resources: FetchResources,
        http: Arc<dyn ScraperEngine>,
        browser: Arc<dyn ScraperEngine>,
    ) -> Self {
        Self {
            config,
            resources,
            http,
            browser,
        }
    }

    pub fn resources(&self) -> &FetchResources {
        &self.resources
    }

    /// 获取内容
    ///
    /// # 返回值
    ///
    /// * `Ok(String)` - 页面内容（可能来自缓存）
    /// * `Err(EngineError::SourceHalted)` - 该数据源已熔断
    /// * `Err(EngineError)` - 重试耗尽后的最后一个错误
    #[instrument(skip(self, request), fields(source = %request.source_key, url = %request.url))]
    pub async fn fetch(&self, request: &FetchRequest) -> Result<String, EngineError> {
        let key =
            ContentCache::<String>::key_for(&request.url, request.method, request.payload.as_ref());
        if let Some(hit) = self.resources.cache.get(&key) {
            counter!("fetch_cache_hits_total").increment(1);
            debug!("Cache hit");
            return Ok(hit);
        }

        if let Some(kind) = self.resources.classifier.open_circuit(&request.source_key) {
            return Err(EngineError::SourceHalted {
                source_key: request.source_key.clone(),
                kind,
            });
        }

        let transport = if request.render {
            &self.browser
        } else {
            &self.http
        };

        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let identity = self.resources.identities.next_identity();
            // The browser session is shared, so its egress is fixed at launch.
            let proxy = if request.render {
                None
            } else {
                self.resources.proxies.get_proxy()
            };

            self.resources.limiter.acquire(&request.source_key).await;

            counter!("fetch_requests_total", "transport" => transport.name()).increment(1);
            let scrape = ScrapeRequest {
                url: request.url.clone(),
                method: request.method,
                payload: request.payload.clone(),
                identity,
                proxy: proxy.clone(),
                timeout: Duration::from_secs(self.config.request_timeout_secs),
            };

            let err = match transport.scrape(&scrape).await {
                Ok(response) => {
                    self.resources.classifier.record_success(&request.source_key);
                    let ttl = request
                        .cache_ttl
                        .unwrap_or(Duration::from_secs(self.config.cache_ttl_secs));
                    self.resources.cache.set(&key, response.content.clone(), ttl);
                    debug!(
                        attempt,
                        transport = transport.name(),
                        elapsed_ms = response.response_time_ms,
                        "Fetched"
                    );
                    return Ok(response.content);
                }
                Err(err) => err,
            };

            let kind = err.kind();
            if matches!(kind, ErrorKind::Connection | ErrorKind::Timeout) {
                if let Some(proxy) = &proxy {
                    self.resources.proxies.mark_failed(proxy);
                }
            }

            match self
                .resources
                .classifier
                .handle(&err, &request.source_key)
                .await
            {
                RecoveryAction::Stop => {
                    return Err(EngineError::SourceHalted {
                        source_key: request.source_key.clone(),
                        kind,
                    });
                }
                RecoveryAction::Continue if attempt > self.config.max_retries => {
                    warn!(attempt, error = %err, "Retries exhausted");
                    return Err(err);
                }
                RecoveryAction::Continue => {}
            }
        }
    }
}

#[async_trait]
impl DetailFetcher for Fetcher {
    async fn fetch_detail(&self, source: &SourceConfig, url: &str) -> Result<RawRecord, EngineError> {
        let request = FetchRequest {
            url: url.to_string(),
            method: HttpMethod::Get,
            payload: None,
            source_key: source.id.clone(),
            render: source.needs_browser(),
            cache_ttl: Some(Duration::from_secs(self.config.detail_page_cache_ttl_secs)),
        };
        let content = self.fetch(&request).await?;
        let selectors = source.resolve_selectors();
        let mut record = Extractor::new(&selectors.detail, url, &source.id).extract_detail(&content)?;
        record.url.get_or_insert_with(|| url.to_string());
        Ok(record)
    }
}
