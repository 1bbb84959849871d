// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use parking_lot::Mutex;
use serde::Deserialize;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// 速率预算：`window_secs`秒内最多`requests`次请求
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RateLimit {
    pub requests: u32,
    pub window_secs: u64,
}

impl RateLimit {
    pub fn new(requests: u32, window_secs: u64) -> Self {
        Self {
            requests,
            window_secs,
        }
    }

    fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

impl Default for RateLimit {
    fn default() -> Self {
        Self::new(30, 60)
    }
}

/// 速率限制配置
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RateLimitingConfig {
    /// 未知速率等级时使用的默认预算
    pub default: RateLimit,
    /// 速率等级 -> 预算
    pub classes: HashMap<String, RateLimit>,
}

impl RateLimitingConfig {
    /// 查找速率等级对应的预算
    pub fn limit_for_class(&self, rate_class: &str) -> RateLimit {
        self.classes
            .get(rate_class)
            .copied()
            .unwrap_or(self.default)
    }
}

#[derive(Debug, Default)]
struct LimiterState {
    limits: HashMap<String, RateLimit>,
    /// 数据源 -> 最近请求时间戳（升序）
    history: HashMap<String, VecDeque<Instant>>,
}

/// 按数据源的滑动窗口限流器
///
/// 任意窗口内放行的请求数不超过配置上限；调用方在必要时被挂起，不会返回错误
pub struct RateLimiter {
    default_limit: RateLimit,
    state: Mutex<LimiterState>,
}

impl RateLimiter {
    pub fn new(default_limit: RateLimit) -> Self {
        Self {
            default_limit,
            state: Mutex::new(LimiterState::default()),
        }
    }

    /// 为数据源设置预算
    pub fn register(&self, source_key: &str, limit: RateLimit) {
        self.state.lock().limits.insert(source_key.to_string(), limit);
    }

    /// 等待直到请求可以在预算内执行
    pub async fn acquire(&self, source_key: &str) {
        loop {
            let wait = {
                let mut state = self.state.lock();
                let limit = state
                    .limits
                    .get(source_key)
                    .copied()
                    .unwrap_or(self.default_limit);
                let window = limit.window();
                let now = Instant::now();
                let timestamps = state.history.entry(source_key.to_string()).or_default();

                while timestamps
                    .front()
                    .is_some_and(|oldest| now.duration_since(*oldest) >= window)
                {
                    timestamps.pop_front();
                }

                if limit.requests == 0 || (timestamps.len() as u32) < limit.requests {
                    timestamps.push_back(now);
                    return;
                }

                match timestamps.front() {
                    Some(oldest) => window.saturating_sub(now.duration_since(*oldest)),
                    None => Duration::ZERO,
                }
            };

            debug!(
                source = %source_key,
                wait_ms = wait.as_millis() as u64,
                "Rate limit reached, waiting"
            );
            tokio::time::sleep(wait).await;
        }
    }

    /// 当前窗口内已放行的请求数
    pub fn in_flight_window(&self, source_key: &str) -> usize {
        let mut state = self.state.lock();
        let limit = state
            .limits
            .get(source_key)
            .copied()
            .unwrap_or(self.default_limit);
        let now = Instant::now();
        match state.history.get_mut(source_key) {
            Some(timestamps) => {
                timestamps.retain(|t| now.duration_since(*t) < limit.window());
                timestamps.len()
            }
            None => 0,
        }
    }
}
