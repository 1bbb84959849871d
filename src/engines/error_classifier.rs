// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::engines::traits::{EngineError, ErrorKind};
use metrics::{counter, gauge};
use parking_lot::Mutex;
use rand::Rng;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{error, warn};

/// 各错误类型的熔断阈值
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct KindThresholds {
    pub connection: u32,
    pub parsing: u32,
    pub rate_limit: u32,
    pub timeout: u32,
    pub unknown: u32,
}

impl Default for KindThresholds {
    fn default() -> Self {
        Self {
            connection: 5,
            parsing: 3,
            rate_limit: 2,
            timeout: 4,
            unknown: 3,
        }
    }
}

impl KindThresholds {
    pub fn for_kind(&self, kind: ErrorKind) -> u32 {
        match kind {
            ErrorKind::Connection => self.connection,
            ErrorKind::Parsing => self.parsing,
            ErrorKind::RateLimit => self.rate_limit,
            ErrorKind::Timeout => self.timeout,
            ErrorKind::Unknown => self.unknown,
        }
    }
}

/// 各错误类型的退避区间（毫秒，闭区间）
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct KindBackoff {
    pub connection: [u64; 2],
    pub parsing: [u64; 2],
    pub rate_limit: [u64; 2],
    pub timeout: [u64; 2],
    pub unknown: [u64; 2],
}

impl Default for KindBackoff {
    fn default() -> Self {
        Self {
            connection: [2_000, 5_000],
            parsing: [500, 1_500],
            rate_limit: [30_000, 60_000],
            timeout: [5_000, 10_000],
            unknown: [1_000, 3_000],
        }
    }
}

impl KindBackoff {
    pub fn for_kind(&self, kind: ErrorKind) -> (u64, u64) {
        let [a, b] = match kind {
            ErrorKind::Connection => self.connection,
            ErrorKind::Parsing => self.parsing,
            ErrorKind::RateLimit => self.rate_limit,
            ErrorKind::Timeout => self.timeout,
            ErrorKind::Unknown => self.unknown,
        };
        (a.min(b), a.max(b))
    }
}

/// 错误分类器配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ErrorClassifierConfig {
    /// 熔断打开后的冷却时间（秒）
    pub cooldown_secs: u64,
    pub thresholds: KindThresholds,
    pub backoff_ms: KindBackoff,
}

impl Default for ErrorClassifierConfig {
    fn default() -> Self {
        Self {
            cooldown_secs: 300,
            thresholds: KindThresholds::default(),
            backoff_ms: KindBackoff::default(),
        }
    }
}

/// 错误处理后的动作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryAction {
    /// 已执行退避，可以重试
    Continue,
    /// 熔断已打开，停止该数据源
    Stop,
}

#[derive(Debug, Default, Clone)]
struct ErrorCount {
    count: u32,
    opened_at: Option<Instant>,
}

/// 错误分类与熔断
///
/// 按（数据源，错误类型）计数；达到阈值后熔断，冷却期内不再尝试恢复
pub struct ErrorClassifier {
    config: ErrorClassifierConfig,
    counts: Mutex<HashMap<(String, ErrorKind), ErrorCount>>,
}

impl Default for ErrorClassifier {
    fn default() -> Self {
        Self::new(ErrorClassifierConfig::default())
    }
}

impl ErrorClassifier {
    pub fn new(config: ErrorClassifierConfig) -> Self {
        Self {
            config,
            counts: Mutex::new(HashMap::new()),
        }
    }

    fn cooldown(&self) -> Duration {
        Duration::from_secs(self.config.cooldown_secs)
    }

    /// 处理一次失败
    ///
    /// # 参数
    ///
    /// * `err` - 抓取错误
    /// * `source_key` - 数据源标识
    ///
    /// # 返回值
    ///
    /// 未达阈值时执行退避并返回`Continue`，否则返回`Stop`
    pub async fn handle(&self, err: &EngineError, source_key: &str) -> RecoveryAction {
        let kind = err.kind();
        counter!("fetch_errors_total", "kind" => kind.as_str()).increment(1);

        let threshold = self.config.thresholds.for_kind(kind).max(1);
        let count = match self.count_failure(source_key, kind, threshold) {
            Some(count) => count,
            None => return RecoveryAction::Stop,
        };

        if count >= threshold {
            error!(
                source = %source_key,
                kind = kind.as_str(),
                count,
                error = %err,
                "Failure threshold reached, halting source"
            );
            counter!("circuit_opened_total", "source" => source_key.to_string()).increment(1);
            return RecoveryAction::Stop;
        }

        let delay = self.backoff_for(kind);
        warn!(
            source = %source_key,
            kind = kind.as_str(),
            count,
            threshold,
            backoff_ms = delay.as_millis() as u64,
            error = %err,
            "Recoverable fetch error"
        );
        tokio::time::sleep(delay).await;
        RecoveryAction::Continue
    }

    /// 累加一次失败计数
    ///
    /// 熔断仍在冷却期内时返回`None`；冷却结束则关闭熔断并重新计数
    fn count_failure(&self, source_key: &str, kind: ErrorKind, threshold: u32) -> Option<u32> {
        let cooldown = self.cooldown();
        let mut counts = self.counts.lock();
        let entry = counts.entry((source_key.to_string(), kind)).or_default();

        if let Some(opened_at) = entry.opened_at {
            if opened_at.elapsed() < cooldown {
                return None;
            }
            *entry = ErrorCount::default();
            gauge!("circuit_open", "source" => source_key.to_string()).set(0.0);
        }

        entry.count += 1;
        if entry.count >= threshold {
            entry.opened_at = Some(Instant::now());
            gauge!("circuit_open", "source" => source_key.to_string()).set(1.0);
        }
        Some(entry.count)
    }

    /// 随机退避时长
    fn backoff_for(&self, kind: ErrorKind) -> Duration {
        let (min, max) = self.config.backoff_ms.for_kind(kind);
        let millis = if min == max {
            min
        } else {
            rand::rng().random_range(min..=max)
        };
        Duration::from_millis(millis)
    }

    /// 数据源是否有处于冷却期内的熔断
    pub fn open_circuit(&self, source_key: &str) -> Option<ErrorKind> {
        let cooldown = self.cooldown();
        let counts = self.counts.lock();
        counts.iter().find_map(|((source, kind), entry)| {
            let open = source == source_key
                && entry
                    .opened_at
                    .is_some_and(|opened_at| opened_at.elapsed() < cooldown);
            open.then_some(*kind)
        })
    }

    pub fn is_open(&self, source_key: &str) -> bool {
        self.open_circuit(source_key).is_some()
    }

    /// 传输成功后清零该数据源未熔断的计数
    ///
    /// 解析计数不受影响：页面可以正常返回却无法解析
    pub fn record_success(&self, source_key: &str) {
        let mut counts = self.counts.lock();
        counts.retain(|(source, kind), entry| {
            source != source_key || entry.opened_at.is_some() || *kind == ErrorKind::Parsing
        });
    }

    /// 页面成功解析后清零解析计数
    pub fn record_parsed(&self, source_key: &str) {
        let mut counts = self.counts.lock();
        counts.retain(|(source, kind), entry| {
            source != source_key || entry.opened_at.is_some() || *kind != ErrorKind::Parsing
        });
    }

    /// 当前失败计数
    pub fn failure_count(&self, source_key: &str, kind: ErrorKind) -> u32 {
        self.counts
            .lock()
            .get(&(source_key.to_string(), kind))
            .map(|entry| entry.count)
            .unwrap_or(0)
    }
}
