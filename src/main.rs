// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use anyhow::Context;
use clap::{Parser, Subcommand};
use jobrs::config::settings::Settings;
use jobrs::domain::repositories::job_repository::JobSink;
use jobrs::domain::services::business_unit_classifier::BusinessUnitClassifier;
use jobrs::domain::services::job_analyzer::HeuristicAnalyzer;
use jobrs::domain::services::llm_service::LLMService;
use jobrs::domain::services::notification_service::AdminNotifier;
use jobrs::domain::services::text_enricher::{DisabledEnricher, TextEnricher};
use jobrs::engines::browser_engine::BrowserEngine;
use jobrs::engines::browser_session::BrowserSession;
use jobrs::engines::error_classifier::ErrorClassifier;
use jobrs::engines::fetcher::{FetchResources, Fetcher};
use jobrs::engines::health_monitor::HealthMonitor;
use jobrs::engines::identity_rotator::IdentityRotator;
use jobrs::engines::proxy_rotator::ProxyRotator;
use jobrs::engines::rate_limiter::RateLimiter;
use jobrs::engines::reqwest_engine::ReqwestEngine;
use jobrs::infrastructure::cache::content_cache::ContentCache;
use jobrs::infrastructure::observability::metrics::{init_metrics, SystemProbe};
use jobrs::infrastructure::repositories::http_job_sink::HttpJobSink;
use jobrs::infrastructure::repositories::memory_job_sink::MemoryJobSink;
use jobrs::infrastructure::repositories::yaml_source_repo::YamlSourceRepository;
use jobrs::infrastructure::services::webhook_notifier::{LogNotifier, WebhookNotifier};
use jobrs::presentation::routes::{self, AppState};
use jobrs::utils::telemetry;
use jobrs::workers::orchestrator::{Orchestrator, OrchestratorDeps};
use jobrs::workers::pipeline::NormalizationPipeline;
use jobrs::workers::scheduler::Scheduler;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{info, warn};

/// 招聘信息采集服务
#[derive(Debug, Parser)]
#[command(name = "jobrs", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// 启动HTTP服务（以及可选的定时调度）
    Serve,
    /// 运行一次全部启用的数据源后退出
    RunAll,
    /// 运行单个数据源后退出
    Run {
        /// 数据源ID
        source_id: String,
    },
}

/// 主函数
///
/// 应用程序入口点，负责初始化所有组件并执行子命令
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 1. Load configuration
    let settings = Settings::new().context("failed to load configuration")?;

    // 2. Initialize logging and metrics
    telemetry::init_telemetry(settings.log.json);
    info!("Starting jobrs...");
    if settings.metrics.enabled {
        init_metrics(settings.metrics.listen)?;
        info!("Prometheus exporter listening on {}", settings.metrics.listen);
    }

    // 3. Fetch path
    let resources = FetchResources {
        cache: Arc::new(ContentCache::new(&settings.cache)),
        identities: Arc::new(IdentityRotator::new(&settings.identity)),
        proxies: Arc::new(ProxyRotator::new(&settings.proxy)),
        limiter: Arc::new(RateLimiter::new(settings.rate_limiting.default)),
        classifier: Arc::new(ErrorClassifier::new(settings.error_classifier.clone())),
    };
    let session = Arc::new(BrowserSession::new(settings.browser.clone()));
    let fetcher = Arc::new(Fetcher::new(
        settings.fetcher.clone(),
        resources,
        Arc::new(ReqwestEngine),
        Arc::new(BrowserEngine::new(session.clone())),
    ));

    // 4. Normalization pipeline
    let enricher: Arc<dyn TextEnricher> = match LLMService::from_config(&settings.llm)? {
        Some(service) => Arc::new(service),
        None => {
            warn!("LLM enrichment disabled, missing fields will not be backfilled");
            Arc::new(DisabledEnricher)
        }
    };
    let classifier = Arc::new(BusinessUnitClassifier::from_config(&settings.classifier)?);
    let pipeline = Arc::new(NormalizationPipeline::new(
        settings.pipeline.clone(),
        enricher,
        Arc::new(HeuristicAnalyzer),
        fetcher.clone(),
        classifier,
        &settings.cache,
    ));

    // 5. Collaborators
    let sink: Arc<dyn JobSink> = match &settings.persistence.ingest_url {
        Some(url) => Arc::new(HttpJobSink::new(
            url.clone(),
            settings.persistence.api_token.clone(),
        )),
        None => {
            warn!("No ingest URL configured, records are kept in memory only");
            Arc::new(MemoryJobSink::new())
        }
    };
    let notifier: Arc<dyn AdminNotifier> = match &settings.notifications.webhook_url {
        Some(url) => Arc::new(WebhookNotifier::new(
            url.clone(),
            settings.notifications.secret.clone(),
        )),
        None => Arc::new(LogNotifier),
    };

    let health = Arc::new(HealthMonitor::new(
        settings.health.clone(),
        Arc::new(SystemProbe::new()),
    ));
    let orchestrator = Arc::new(Orchestrator::new(
        settings.orchestrator.clone(),
        settings.rate_limiting.clone(),
        OrchestratorDeps {
            sources: Arc::new(YamlSourceRepository::new(settings.sources.path.clone())),
            fetcher,
            pipeline,
            health,
            sink,
            notifier,
        },
    ));

    let result = match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(&settings, orchestrator).await,
        Command::RunAll => {
            let summary = orchestrator.run_all().await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
            Ok(())
        }
        Command::Run { source_id } => {
            let summary = orchestrator.run_one(&source_id).await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
            Ok(())
        }
    };

    session.release().await;
    result
}

async fn serve(settings: &Settings, orchestrator: Arc<Orchestrator>) -> anyhow::Result<()> {
    let scheduler = settings.scheduler.enabled.then(|| {
        Scheduler::new(
            orchestrator.clone(),
            Duration::from_secs(settings.scheduler.interval_secs),
        )
        .start()
    });

    let app = routes::routes(AppState { orchestrator });

    let addr = settings.server.address();
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(handle) = scheduler {
        handle.abort();
    }
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
    }
}
