// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::workers::orchestrator::Orchestrator;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

/// 定时调度配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub enabled: bool,
    pub interval_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_secs: 21600,
        }
    }
}

/// 定时运行全部数据源
///
/// 错过的触发点直接跳过；上一次运行未结束时不会重叠启动
pub struct Scheduler {
    orchestrator: Arc<Orchestrator>,
    interval: Duration,
}

impl Scheduler {
    pub fn new(orchestrator: Arc<Orchestrator>, interval: Duration) -> Self {
        Self {
            orchestrator,
            interval,
        }
    }

    /// 运行调度循环
    pub async fn run(&self) {
        info!(interval_secs = self.interval.as_secs(), "Scheduler started");

        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            interval.tick().await;
            self.tick().await;
        }
    }

    /// 执行一次触发
    ///
    /// # 返回值
    ///
    /// 是否真正启动了运行
    pub async fn tick(&self) -> bool {
        match self.orchestrator.try_run_all().await {
            None => {
                warn!("Previous run still in progress, skipping scheduled run");
                false
            }
            Some(Ok(summary)) => {
                info!(
                    sources_failed = summary.sources_failed,
                    records_new = summary.records_new,
                    "Scheduled run finished"
                );
                true
            }
            Some(Err(e)) => {
                error!("Scheduled run failed: {}", e);
                true
            }
        }
    }

    /// 启动后台运行
    pub fn start(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }
}
