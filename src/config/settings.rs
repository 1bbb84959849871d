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

use crate::domain::services::business_unit_classifier::BusinessUnitConfig;
use crate::domain::services::llm_service::LlmConfig;
use crate::engines::browser_session::BrowserSettings;
use crate::engines::error_classifier::ErrorClassifierConfig;
use crate::engines::fetcher::FetcherConfig;
use crate::engines::health_monitor::HealthConfig;
use crate::engines::identity_rotator::IdentityConfig;
use crate::engines::proxy_rotator::ProxyConfig;
use crate::engines::rate_limiter::RateLimitingConfig;
use crate::infrastructure::cache::content_cache::CacheConfig;
use crate::workers::orchestrator::OrchestratorConfig;
use crate::workers::pipeline::PipelineConfig;
use crate::workers::scheduler::SchedulerConfig;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;

/// 应用程序配置设置
///
/// 每个小节都有默认值，配置文件只需写出需要覆盖的键
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// 服务器配置
    pub server: ServerSettings,
    /// 日志配置
    pub log: LogSettings,
    /// 指标导出配置
    pub metrics: MetricsSettings,
    pub scheduler: SchedulerConfig,
    /// 数据源配置文件
    pub sources: SourcesSettings,
    pub fetcher: FetcherConfig,
    pub browser: BrowserSettings,
    pub cache: CacheConfig,
    /// 速率限制配置
    pub rate_limiting: RateLimitingConfig,
    pub proxy: ProxyConfig,
    pub identity: IdentityConfig,
    pub error_classifier: ErrorClassifierConfig,
    pub health: HealthConfig,
    pub pipeline: PipelineConfig,
    pub orchestrator: OrchestratorConfig,
    /// 业务单元分类配置
    pub classifier: BusinessUnitConfig,
    pub llm: LlmConfig,
    /// 持久化协作方配置
    pub persistence: PersistenceSettings,
    /// 管理员通知配置
    pub notifications: NotificationSettings,
}

/// 服务器配置设置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// 服务器监听主机地址
    pub host: String,
    /// 服务器监听端口
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

/// 日志配置设置
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// 输出JSON格式日志
    pub json: bool,
}

/// 指标配置设置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsSettings {
    pub enabled: bool,
    pub listen: SocketAddr,
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            listen: SocketAddr::from(([0, 0, 0, 0], 9000)),
        }
    }
}

/// 数据源配置设置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourcesSettings {
    pub path: PathBuf,
}

impl Default for SourcesSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("config/sources.yaml"),
        }
    }
}

/// 持久化配置设置
///
/// 未配置 `ingest_url` 时使用进程内存储
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PersistenceSettings {
    pub ingest_url: Option<String>,
    pub api_token: Option<String>,
}

/// 通知配置设置
///
/// 未配置 `webhook_url` 时只写日志
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NotificationSettings {
    pub webhook_url: Option<String>,
    /// Webhook签名密钥
    pub secret: String,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            webhook_url: None,
            secret: "change-me".to_string(),
        }
    }
}

impl ServerSettings {
    /// 监听地址
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Settings {
    /// 创建新的配置实例
    ///
    /// 加载顺序：内置默认值 -> `config/default` -> `config/{APP_ENVIRONMENT}` -> `JOBRS__*` 环境变量
    ///
    /// # Returns
    ///
    /// * `Ok(Settings)` - 成功加载的配置
    /// * `Err(ConfigError)` - 配置加载失败
    pub fn new() -> Result<Self, ConfigError> {
        Self::with_environment(
            Environment::with_prefix("JOBRS")
                .separator("__")
                .try_parsing(true),
        )
    }

    /// 使用指定的环境变量源加载配置
    pub fn with_environment(environment: Environment) -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "default".to_string());
        let builder = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(environment);

        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
#[path = "settings_test.rs"]
mod tests;
