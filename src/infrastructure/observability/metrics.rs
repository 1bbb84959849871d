// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::engines::health_monitor::{ResourceProbe, ResourceSample};
use anyhow::{Context, Result};
use metrics::{describe_counter, describe_gauge, describe_histogram, Unit};
use metrics_exporter_prometheus::PrometheusBuilder;
use parking_lot::Mutex;
use std::net::SocketAddr;
use sysinfo::{
    MemoryRefreshKind, Pid, ProcessRefreshKind, ProcessesToUpdate, RefreshKind, System,
};
use tracing::{info, warn};

/// 初始化指标系统
///
/// 安装Prometheus记录器并在 `listen` 上暴露 `/metrics`
pub fn init_metrics(listen: SocketAddr) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(listen)
        .install()
        .context("Failed to install Prometheus recorder")?;

    describe_metrics();
    info!(listen = %listen, "Prometheus exporter listening");
    Ok(())
}

fn describe_metrics() {
    describe_counter!(
        "fetch_requests_total",
        "Total number of outbound fetches, labelled by transport"
    );
    describe_counter!("fetch_cache_hits_total", "Fetches served from the content cache");
    describe_counter!("fetch_errors_total", "Classified fetch errors, labelled by kind");
    describe_counter!(
        "circuit_opened_total",
        "Times a source was halted after reaching an error threshold"
    );
    describe_counter!("proxy_quarantined_total", "Proxies placed in quarantine");
    describe_counter!(
        "records_normalized_total",
        "Records produced by the pipeline, labelled by business unit"
    );
    describe_counter!("records_dropped_total", "Records dropped, labelled by reason code");
    describe_counter!("scrape_runs_total", "Closed scrape runs, labelled by status");

    describe_gauge!(
        "process_memory_usage_ratio",
        Unit::Percent,
        "Process resident memory as a ratio of total memory (0.0 to 1.0)"
    );
    describe_gauge!(
        "process_cpu_usage_ratio",
        Unit::Percent,
        "Process CPU usage normalised by core count (0.0 to 1.0)"
    );
    describe_gauge!("pipeline_error_ratio", "Rolling error ratio seen by the health monitor");
    describe_gauge!("pipeline_batch_size", "Current batch size, labelled by source");
    describe_gauge!("circuit_open", "1 while a source's circuit is open");

    describe_histogram!(
        "scrape_run_duration_seconds",
        Unit::Seconds,
        "Duration of a single source run in seconds"
    );
}

/// 基于sysinfo的进程资源探针
pub struct SystemProbe {
    pid: Option<Pid>,
    system: Mutex<System>,
    cores: f64,
}

impl SystemProbe {
    pub fn new() -> Self {
        let pid = sysinfo::get_current_pid()
            .map_err(|e| warn!("Cannot resolve current pid, resource probe disabled: {}", e))
            .ok();
        let mut system = System::new_with_specifics(
            RefreshKind::nothing().with_memory(MemoryRefreshKind::nothing().with_ram()),
        );
        system.refresh_memory();
        let cores = std::thread::available_parallelism()
            .map(|n| n.get() as f64)
            .unwrap_or(1.0);

        Self {
            pid,
            system: Mutex::new(system),
            cores,
        }
    }
}

impl Default for SystemProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceProbe for SystemProbe {
    fn sample(&self) -> ResourceSample {
        let Some(pid) = self.pid else {
            return ResourceSample::default();
        };

        let mut system = self.system.lock();
        system.refresh_memory();
        system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[pid]),
            true,
            ProcessRefreshKind::nothing().with_memory().with_cpu(),
        );

        let total = system.total_memory();
        match system.process(pid) {
            Some(process) if total > 0 => ResourceSample {
                memory_ratio: (process.memory() as f64 / total as f64).clamp(0.0, 1.0),
                // cpu_usage is a percentage of one core.
                cpu_ratio: (process.cpu_usage() as f64 / 100.0 / self.cores).clamp(0.0, 1.0),
            },
            _ => ResourceSample::default(),
        }
    }
}
