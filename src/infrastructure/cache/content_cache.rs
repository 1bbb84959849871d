// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::source_config::HttpMethod;
use lru::LruCache;
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::num::NonZeroUsize;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

const DEFAULT_CAPACITY: usize = 10_000;

/// 缓存配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// 最大缓存条目数
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_CAPACITY,
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        now > self.expires_at
    }
}

/// 缓存统计信息
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
    /// 容量压力下按LRU淘汰的条目数
    pub evictions: u64,
    /// 因过期被移除的条目数
    pub expirations: u64,
}

struct CacheInner<V> {
    entries: LruCache<String, CacheEntry<V>>,
    stats: CacheStats,
}

/// 有界TTL缓存
///
/// 过期条目永不返回；满载时先清理过期条目，再淘汰最久未使用的条目
pub struct ContentCache<V: Clone> {
    inner: Mutex<CacheInner<V>>,
}

impl<V: Clone> ContentCache<V> {
    pub fn new(config: &CacheConfig) -> Self {
        let capacity = NonZeroUsize::new(config.max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(CacheInner {
                entries: LruCache::new(capacity),
                stats: CacheStats {
                    capacity: capacity.get(),
                    ..Default::default()
                },
            }),
        }
    }

    /// 获取缓存值
    pub fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        let mut inner = self.inner.lock();

        let expired = match inner.entries.peek(key) {
            Some(entry) => entry.is_expired(now),
            None => {
                inner.stats.misses += 1;
                return None;
            }
        };

        if expired {
            inner.entries.pop(key);
            inner.stats.expirations += 1;
            inner.stats.misses += 1;
            return None;
        }

        let value = inner.entries.get(key).map(|entry| entry.value.clone());
        inner.stats.hits += 1;
        value
    }

    /// 设置缓存值
    pub fn set(&self, key: &str, value: V, ttl: Duration) {
        let now = Instant::now();
        let mut inner = self.inner.lock();

        let is_new = !inner.entries.contains(key);
        if is_new && inner.entries.len() >= inner.entries.cap().get() {
            let purged = purge(&mut inner.entries, now);
            inner.stats.expirations += purged as u64;
            if inner.entries.len() >= inner.entries.cap().get() {
                inner.stats.evictions += 1;
            }
        }

        inner.entries.push(
            key.to_string(),
            CacheEntry {
                value,
                expires_at: now + ttl,
            },
        );
    }

    pub fn remove(&self, key: &str) -> Option<V> {
        self.inner.lock().entries.pop(key).map(|entry| entry.value)
    }

    /// 清理所有过期条目，返回清理数量
    pub fn purge_expired(&self) -> usize {
        let mut inner = self.inner.lock();
        let purged = purge(&mut inner.entries, Instant::now());
        inner.stats.expirations += purged as u64;
        if purged > 0 {
            debug!(purged, remaining = inner.entries.len(), "Purged expired cache entries");
        }
        purged
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock();
        CacheStats {
            entries: inner.entries.len(),
            ..inner.stats
        }
    }

    /// 请求缓存键：SHA-256(method \n url \n payload)
    pub fn key_for(url: &str, method: HttpMethod, payload: Option<&Value>) -> String {
        let payload = payload.map(Value::to_string).unwrap_or_default();
        Self::key_for_parts(&[method.as_str(), url, &payload])
    }

    /// 任意片段组合的缓存键
    pub fn key_for_parts(parts: &[&str]) -> String {
        let mut hasher = Sha256::new();
        for (i, part) in parts.iter().enumerate() {
            if i > 0 {
                hasher.update(b"\n");
            }
            hasher.update(part.as_bytes());
        }
        hex::encode(hasher.finalize())
    }
}

fn purge<V>(entries: &mut LruCache<String, CacheEntry<V>>, now: Instant) -> usize {
    let expired: Vec<String> = entries
        .iter()
        .filter(|(_, entry)| entry.is_expired(now))
        .map(|(key, _)| key.clone())
        .collect();
    for key in &expired {
        entries.pop(key);
    }
    expired.len()
}
