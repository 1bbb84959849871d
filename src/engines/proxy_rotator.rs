// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use metrics::counter;
use parking_lot::Mutex;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// 代理轮换配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// 代理地址列表
    pub proxies: Vec<String>,
    /// 隔离时长（秒）
    pub quarantine_secs: u64,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            proxies: Vec::new(),
            quarantine_secs: 3600,
        }
    }
}

#[derive(Debug, Default)]
struct ProxyState {
    cursor: usize,
    /// 代理 -> 隔离开始时间
    quarantined: HashMap<String, Instant>,
}

/// 代理轮换器
///
/// 在未隔离的代理之间轮询；全部不可用时返回`None`表示直连
pub struct ProxyRotator {
    proxies: Vec<String>,
    quarantine: Duration,
    state: Mutex<ProxyState>,
}

impl ProxyRotator {
    pub fn new(config: &ProxyConfig) -> Self {
        Self {
            proxies: config.proxies.clone(),
            quarantine: Duration::from_secs(config.quarantine_secs),
            state: Mutex::new(ProxyState::default()),
        }
    }

    /// 获取下一个可用代理
    pub fn get_proxy(&self) -> Option<String> {
        if self.proxies.is_empty() {
            return None;
        }

        let mut state = self.state.lock();
        self.purge_expired(&mut state);

        let count = self.proxies.len();
        for offset in 0..count {
            let index = (state.cursor + offset) % count;
            let proxy = &self.proxies[index];
            if !state.quarantined.contains_key(proxy) {
                state.cursor = (index + 1) % count;
                return Some(proxy.clone());
            }
        }

        debug!("All {} proxies quarantined, falling back to direct connection", count);
        None
    }

    /// 隔离失败的代理
    pub fn mark_failed(&self, proxy: &str) {
        let mut state = self.state.lock();
        state.quarantined.insert(proxy.to_string(), Instant::now());
        counter!("proxy_quarantined_total").increment(1);
        warn!(
            proxy = %proxy,
            quarantine_secs = self.quarantine.as_secs(),
            "Proxy quarantined"
        );
    }

    /// 当前被隔离的代理数
    pub fn quarantined_count(&self) -> usize {
        let mut state = self.state.lock();
        self.purge_expired(&mut state);
        state.quarantined.len()
    }

    fn purge_expired(&self, state: &mut ProxyState) {
        let quarantine = self.quarantine;
        state
            .quarantined
            .retain(|_, since| since.elapsed() < quarantine);
    }
}
