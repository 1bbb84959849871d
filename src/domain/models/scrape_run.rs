// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 抓取运行状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Success,
    Partial,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Running => "running",
            RunStatus::Success => "success",
            RunStatus::Partial => "partial",
            RunStatus::Failed => "failed",
        }
    }
}

/// 针对单个数据源的一次抓取运行
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapeRun {
    pub id: Uuid,
    pub source_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub found: u64,
    pub new: u64,
    pub errors: u64,
    pub status: RunStatus,
    pub error_summary: Option<String>,
}

impl ScrapeRun {
    /// 开始新的运行
    pub fn start(source_id: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            source_id: source_id.to_string(),
            started_at: Utc::now(),
            finished_at: None,
            found: 0,
            new: 0,
            errors: 0,
            status: RunStatus::Running,
            error_summary: None,
        }
    }

    /// 正常结束：有记录级错误时为部分成功
    pub fn complete(&mut self) {
        self.status = if self.errors > 0 {
            RunStatus::Partial
        } else {
            RunStatus::Success
        };
        self.finished_at = Some(Utc::now());
    }

    /// 因未恢复的错误结束
    pub fn fail(&mut self, summary: impl Into<String>) {
        self.status = RunStatus::Failed;
        self.error_summary = Some(summary.into());
        self.finished_at = Some(Utc::now());
    }

    pub fn is_closed(&self) -> bool {
        self.finished_at.is_some()
    }

    pub fn duration_seconds(&self) -> f64 {
        let end = self.finished_at.unwrap_or_else(Utc::now);
        (end - self.started_at).num_milliseconds().max(0) as f64 / 1000.0
    }
}

/// 运行汇总
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub sources_total: u64,
    pub sources_succeeded: u64,
    pub sources_failed: u64,
    pub records_total: u64,
    pub records_new: u64,
    pub duration_seconds: f64,
    pub runs: Vec<ScrapeRun>,
}

impl RunSummary {
    /// 从已结束的运行汇总
    pub fn from_runs(runs: Vec<ScrapeRun>, duration_seconds: f64) -> Self {
        let mut summary = RunSummary {
            sources_total: runs.len() as u64,
            duration_seconds,
            ..Default::default()
        };
        for run in &runs {
            match run.status {
                RunStatus::Success | RunStatus::Partial => summary.sources_succeeded += 1,
                RunStatus::Failed | RunStatus::Running => summary.sources_failed += 1,
            }
            summary.records_total += run.found;
            summary.records_new += run.new;
        }
        summary.runs = runs;
        summary
    }
}
