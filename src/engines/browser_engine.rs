// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::engines::browser_session::BrowserSession;
use crate::engines::human_behavior::BehaviorPlan;
use crate::engines::traits::{EngineError, ScrapeRequest, ScrapeResponse, ScraperEngine};
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::network::{Headers, SetExtraHttpHeadersParams};
use chromiumoxide::layout::Point;
use chromiumoxide::Page;
use rand::Rng;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

fn browser_err(e: impl std::fmt::Display) -> EngineError {
    EngineError::Browser(e.to_string())
}

/// `[document.readyState === "complete", 已加载的资源数]`
const LOAD_STATE_SCRIPT: &str =
    "[document.readyState === 'complete', performance.getEntriesByType('resource').length]";
const IDLE_POLL: Duration = Duration::from_millis(100);
const IDLE_QUIET: Duration = Duration::from_millis(500);

/// 网络空闲判定
///
/// 文档加载完成且资源数在 `quiet` 时长内不再增长即视为空闲
struct IdleWatch {
    quiet: Duration,
    resources: Option<u64>,
    stable_since: Option<Instant>,
}

impl IdleWatch {
    fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            resources: None,
            stable_since: None,
        }
    }

    /// 记录一次采样，返回是否已空闲
    fn observe(&mut self, complete: bool, resources: u64, now: Instant) -> bool {
        if !complete {
            self.resources = Some(resources);
            self.stable_since = None;
            return false;
        }
        match self.stable_since {
            Some(since) if self.resources == Some(resources) => {
                now.duration_since(since) >= self.quiet
            }
            _ => {
                self.resources = Some(resources);
                self.stable_since = Some(now);
                false
            }
        }
    }
}

/// 浏览器渲染传输
///
/// 复用共享会话，按请求打开新页面，导航后模拟人工浏览再读取渲染后的HTML
pub struct BrowserEngine {
    session: Arc<BrowserSession>,
}

impl BrowserEngine {
    pub fn new(session: Arc<BrowserSession>) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &Arc<BrowserSession> {
        &self.session
    }

    async fn render(&self, page: &Page, request: &ScrapeRequest) -> Result<String, EngineError> {
        page.set_user_agent(request.identity.user_agent.as_str())
            .await
            .map_err(browser_err)?;

        let headers: Map<String, Value> = request
            .identity
            .headers
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        if !headers.is_empty() {
            page.execute(SetExtraHttpHeadersParams::new(Headers::new(Value::Object(
                headers,
            ))))
            .await
            .map_err(browser_err)?;
        }

        page.goto(&request.url).await.map_err(browser_err)?;
        let settings = self.session.settings();
        self.wait_for_idle(page, Duration::from_secs(settings.navigation_timeout_secs))
            .await?;

        let plan = BehaviorPlan::random(
            request.identity.viewport,
            (settings.pause_min_ms, settings.pause_max_ms),
        );
        debug!(
            url = %request.url,
            scroll_px = plan.total_scroll(),
            pause_ms = plan.pause.as_millis() as u64,
            "Simulating human browsing"
        );

        for step in &plan.scroll_steps {
            page.evaluate(BehaviorPlan::scroll_script(*step))
                .await
                .map_err(browser_err)?;
            let settle = rand::rng().random_range(120..=400);
            tokio::time::sleep(Duration::from_millis(settle)).await;
        }
        for (x, y) in &plan.mouse_path {
            page.move_mouse(Point::new(*x, *y))
                .await
                .map_err(browser_err)?;
        }
        tokio::time::sleep(plan.pause).await;

        page.content().await.map_err(browser_err)
    }

    /// 等待网络空闲，超过 `limit` 仍未空闲时按当前内容继续
    async fn wait_for_idle(&self, page: &Page, limit: Duration) -> Result<(), EngineError> {
        let deadline = Instant::now() + limit;
        let mut watch = IdleWatch::new(IDLE_QUIET);

        loop {
            let (complete, resources): (bool, u64) = page
                .evaluate(LOAD_STATE_SCRIPT)
                .await
                .map_err(browser_err)?
                .into_value()
                .map_err(browser_err)?;

            let now = Instant::now();
            if watch.observe(complete, resources, now) {
                return Ok(());
            }
            if now >= deadline {
                debug!(resources, "Network never went idle, reading current content");
                return Ok(());
            }
            tokio::time::sleep(IDLE_POLL).await;
        }
    }
}

#[async_trait]
impl ScraperEngine for BrowserEngine {
    /// 执行浏览器渲染抓取
    ///
    /// # 参数
    ///
    /// * `request` - 抓取请求（代理由会话统一配置）
    ///
    /// # 返回值
    ///
    /// * `Ok(ScrapeResponse)` - 渲染后的HTML
    /// * `Err(EngineError)` - 会话、导航或超时错误
    async fn scrape(&self, request: &ScrapeRequest) -> Result<ScrapeResponse, EngineError> {
        let start = Instant::now();
        let navigation_timeout =
            Duration::from_secs(self.session.settings().navigation_timeout_secs);
        let budget = request.timeout.max(navigation_timeout);

        let browser = self.session.acquire().await?;
        let content = tokio::time::timeout(budget, async {
            let page = browser.new_page("about:blank").await.map_err(browser_err)?;
            let rendered = self.render(&page, request).await;
            if let Err(e) = page.close().await {
                debug!(error = %e, "Failed to close page");
            }
            rendered
        })
        .await
        .map_err(|_| EngineError::Timeout)??;

        Ok(ScrapeResponse {
            status_code: 200,
            content,
            content_type: "text/html".to_string(),
            response_time_ms: start.elapsed().as_millis() as u64,
        })
    }

    fn name(&self) -> &'static str {
        "browser"
    }
}
