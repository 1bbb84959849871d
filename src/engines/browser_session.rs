// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::engines::traits::EngineError;
use chromiumoxide::{Browser, BrowserConfig};
use futures::StreamExt;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// 浏览器配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    /// 远程调试地址，设置时连接已有Chrome而不是启动新进程
    pub remote_debugging_url: Option<String>,
    /// 浏览器级代理（会话共享，无法按请求切换）
    pub proxy: Option<String>,
    pub navigation_timeout_secs: u64,
    pub pause_min_ms: u64,
    pub pause_max_ms: u64,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            remote_debugging_url: None,
            proxy: None,
            navigation_timeout_secs: 45,
            pause_min_ms: 1000,
            pause_max_ms: 3000,
        }
    }
}

struct ActiveBrowser {
    browser: Arc<Browser>,
    handler: JoinHandle<()>,
}

/// 共享浏览器会话
///
/// 首次`acquire`时创建，之后复用；`release`关闭浏览器并停止事件处理任务
pub struct BrowserSession {
    settings: BrowserSettings,
    active: RwLock<Option<ActiveBrowser>>,
    create_lock: Mutex<()>,
}

impl BrowserSession {
    pub fn new(settings: BrowserSettings) -> Self {
        Self {
            settings,
            active: RwLock::new(None),
            create_lock: Mutex::new(()),
        }
    }

    pub fn settings(&self) -> &BrowserSettings {
        &self.settings
    }

    /// 获取浏览器实例，不存在时创建
    ///
    /// 先在读锁下检查，再在创建锁下复查，保证并发首次调用只创建一个实例
    pub async fn acquire(&self) -> Result<Arc<Browser>, EngineError> {
        if let Some(active) = self.active.read().await.as_ref() {
            return Ok(active.browser.clone());
        }

        let _guard = self.create_lock.lock().await;
        if let Some(active) = self.active.read().await.as_ref() {
            return Ok(active.browser.clone());
        }

        let (browser, mut handler) = self.launch().await?;
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let browser = Arc::new(browser);
        *self.active.write().await = Some(ActiveBrowser {
            browser: browser.clone(),
            handler,
        });
        Ok(browser)
    }

    async fn launch(&self) -> Result<(Browser, chromiumoxide::Handler), EngineError> {
        if let Some(url) = &self.settings.remote_debugging_url {
            info!(url = %url, "Connecting to remote Chrome instance");
            return Browser::connect(url)
                .await
                .map_err(|e| EngineError::Browser(format!("Failed to connect to remote Chrome: {}", e)));
        }

        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .request_timeout(Duration::from_secs(self.settings.navigation_timeout_secs))
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-blink-features=AutomationControlled");
        if let Some(proxy) = &self.settings.proxy {
            builder = builder.arg(format!("--proxy-server={}", proxy));
        }

        let config = builder.build().map_err(EngineError::Browser)?;
        info!("Launching headless Chrome");
        Browser::launch(config)
            .await
            .map_err(|e| EngineError::Browser(e.to_string()))
    }

    pub async fn is_active(&self) -> bool {
        self.active.read().await.is_some()
    }

    /// 关闭浏览器
    pub async fn release(&self) {
        let Some(active) = self.active.write().await.take() else {
            return;
        };

        match Arc::try_unwrap(active.browser) {
            Ok(mut browser) => {
                if let Err(e) = browser.close().await {
                    warn!(error = %e, "Failed to close browser cleanly");
                }
            }
            Err(_) => warn!("Browser still in use at release, dropping handle"),
        }
        active.handler.abort();
        info!("Browser session released");
    }
}
