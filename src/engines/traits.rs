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

use crate::domain::models::source_config::HttpMethod;
use crate::engines::identity_rotator::Identity;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// 抓取错误分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Connection,
    Parsing,
    RateLimit,
    Timeout,
    Unknown,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 5] = [
        ErrorKind::Connection,
        ErrorKind::Parsing,
        ErrorKind::RateLimit,
        ErrorKind::Timeout,
        ErrorKind::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Connection => "connection",
            ErrorKind::Parsing => "parsing",
            ErrorKind::RateLimit => "rate_limit",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Unknown => "unknown",
        }
    }
}

/// 引擎错误类型
#[derive(Error, Debug)]
pub enum EngineError {
    /// 请求失败
    #[error("Request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
    /// 非成功状态码
    #[error("Unexpected HTTP status {status}")]
    HttpStatus { status: u16 },
    /// 超时
    #[error("Timeout")]
    Timeout,
    /// 浏览器会话错误
    #[error("Browser error: {0}")]
    Browser(String),
    /// 内容解析失败
    #[error("Parse error: {0}")]
    Parse(String),
    /// 数据源已熔断
    #[error("Source {source_key} halted after repeated {kind:?} failures")]
    SourceHalted { source_key: String, kind: ErrorKind },
    /// 其他错误
    #[error("Other error: {0}")]
    Other(String),
}

impl EngineError {
    /// 将错误映射到固定分类
    ///
    /// 消息中包含"rate limit"时优先归为限流
    pub fn kind(&self) -> ErrorKind {
        if self.to_string().to_lowercase().contains("rate limit") {
            return ErrorKind::RateLimit;
        }

        match self {
            EngineError::RequestFailed(e) => {
                if e.status().is_some_and(|s| s.as_u16() == 429) {
                    ErrorKind::RateLimit
                } else if e.is_timeout() {
                    ErrorKind::Timeout
                } else if e.is_connect() || e.is_request() {
                    ErrorKind::Connection
                } else if e.is_decode() || e.is_body() {
                    ErrorKind::Parsing
                } else if e.status().is_some_and(|s| s.is_server_error()) {
                    ErrorKind::Connection
                } else {
                    ErrorKind::Unknown
                }
            }
            EngineError::HttpStatus { status } => match status {
                429 => ErrorKind::RateLimit,
                403 | 500..=599 => ErrorKind::Connection,
                408 => ErrorKind::Timeout,
                _ => ErrorKind::Unknown,
            },
            EngineError::Timeout => ErrorKind::Timeout,
            EngineError::Browser(message) => {
                let message = message.to_lowercase();
                if message.contains("timeout") || message.contains("timed out") {
                    ErrorKind::Timeout
                } else if message.contains("net::") || message.contains("connection") {
                    ErrorKind::Connection
                } else {
                    ErrorKind::Unknown
                }
            }
            EngineError::Parse(_) => ErrorKind::Parsing,
            EngineError::SourceHalted { kind, .. } => *kind,
            EngineError::Other(_) => ErrorKind::Unknown,
        }
    }

    /// 该错误是否终止整个数据源
    pub fn is_terminal(&self) -> bool {
        matches!(self, EngineError::SourceHalted { .. })
    }
}

/// 抓取请求
#[derive(Debug, Clone)]
pub struct ScrapeRequest {
    /// 目标URL
    pub url: String,
    /// 请求方法
    pub method: HttpMethod,
    /// JSON请求体
    pub payload: Option<Value>,
    /// 出站身份（UA与请求头）
    pub identity: Identity,
    /// 代理配置 (URL)
    pub proxy: Option<String>,
    /// 超时时间
    pub timeout: Duration,
}

/// 抓取响应
#[derive(Debug, Clone)]
pub struct ScrapeResponse {
    /// HTTP状态码
    pub status_code: u16,
    /// 响应内容
    pub content: String,
    /// 内容类型
    pub content_type: String,
    /// 响应时间（毫秒）
    pub response_time_ms: u64,
}

/// 抓取引擎特质
#[async_trait]
pub trait ScraperEngine: Send + Sync {
    /// 执行抓取
    async fn scrape(&self, request: &ScrapeRequest) -> Result<ScrapeResponse, EngineError>;

    /// 引擎名称
    fn name(&self) -> &'static str;
}
