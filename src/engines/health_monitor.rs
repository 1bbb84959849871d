// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use metrics::gauge;
use parking_lot::Mutex;
use serde::Deserialize;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, warn};

/// 进程资源采样
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ResourceSample {
    /// 进程常驻内存占系统总内存的比例
    pub memory_ratio: f64,
    /// 进程CPU占用比例（按核数归一）
    pub cpu_ratio: f64,
}

/// 资源探针
pub trait ResourceProbe: Send + Sync {
    fn sample(&self) -> ResourceSample;
}

/// 健康监控配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    pub memory_ceiling_ratio: f64,
    pub cpu_ceiling_ratio: f64,
    pub error_ratio_ceiling: f64,
    /// 滚动错误率保留的样本数
    pub window: usize,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            memory_ceiling_ratio: 0.80,
            cpu_ceiling_ratio: 0.90,
            error_ratio_ceiling: 0.25,
            window: 20,
        }
    }
}

/// 反压指令
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HealthDirectives {
    pub run_gc: bool,
    pub reduce_batch: bool,
    pub increase_delay: bool,
}

impl HealthDirectives {
    pub fn is_nominal(&self) -> bool {
        !(self.run_gc || self.reduce_batch || self.increase_delay)
    }
}

/// 健康监控器
///
/// 根据进程资源与错误率生成反压指令
pub struct HealthMonitor {
    config: HealthConfig,
    probe: Arc<dyn ResourceProbe>,
    samples: Mutex<VecDeque<(u64, u64)>>,
}

impl HealthMonitor {
    pub fn new(config: HealthConfig, probe: Arc<dyn ResourceProbe>) -> Self {
        Self {
            config,
            probe,
            samples: Mutex::new(VecDeque::new()),
        }
    }

    /// 检查健康状态
    ///
    /// # 参数
    ///
    /// * `processed` - 本批处理的记录数
    /// * `errors` - 本批出错的记录数
    ///
    /// # 返回值
    ///
    /// 调用方在继续下一批之前必须执行的指令
    pub fn check_health(&self, processed: u64, errors: u64) -> HealthDirectives {
        let resources = self.probe.sample();
        let error_ratio = ratio(errors, processed);
        let rolling = self.record(processed, errors);

        gauge!("process_memory_usage_ratio").set(resources.memory_ratio);
        gauge!("process_cpu_usage_ratio").set(resources.cpu_ratio);
        gauge!("pipeline_error_ratio").set(rolling);

        let high_errors = error_ratio > self.config.error_ratio_ceiling;
        let high_cpu = resources.cpu_ratio > self.config.cpu_ceiling_ratio;
        let directives = HealthDirectives {
            run_gc: resources.memory_ratio > self.config.memory_ceiling_ratio,
            reduce_batch: high_errors,
            increase_delay: high_errors || high_cpu,
        };

        if directives.is_nominal() {
            debug!(
                memory_ratio = resources.memory_ratio,
                cpu_ratio = resources.cpu_ratio,
                error_ratio,
                "Health nominal"
            );
        } else {
            warn!(
                memory_ratio = resources.memory_ratio,
                cpu_ratio = resources.cpu_ratio,
                error_ratio,
                rolling_error_ratio = rolling,
                run_gc = directives.run_gc,
                reduce_batch = directives.reduce_batch,
                increase_delay = directives.increase_delay,
                "Backpressure directives issued"
            );
        }

        directives
    }

    /// 最近窗口内的错误率
    pub fn rolling_error_ratio(&self) -> f64 {
        let samples = self.samples.lock();
        let (processed, errors) = samples
            .iter()
            .fold((0, 0), |(p, e), (sp, se)| (p + sp, e + se));
        ratio(errors, processed)
    }

    fn record(&self, processed: u64, errors: u64) -> f64 {
        {
            let mut samples = self.samples.lock();
            samples.push_back((processed, errors));
            while samples.len() > self.config.window.max(1) {
                samples.pop_front();
            }
        }
        self.rolling_error_ratio()
    }
}

fn ratio(errors: u64, processed: u64) -> f64 {
    if processed == 0 {
        0.0
    } else {
        errors as f64 / processed as f64
    }
}
