// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 通知原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationReason {
    /// 数据源的某类错误达到阈值
    FailureThreshold,
    /// 抓取运行以失败结束
    RunFailed,
}

/// 发送给管理员的通知
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub source_id: String,
    pub run_id: Uuid,
    pub reason: NotificationReason,
    pub summary: String,
    pub occurred_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(
        source_id: impl Into<String>,
        run_id: Uuid,
        reason: NotificationReason,
        summary: impl Into<String>,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            run_id,
            reason,
            summary: summary.into(),
            occurred_at: Utc::now(),
        }
    }
}

/// 管理员通知协作方
///
/// 调用失败只记录日志，不影响其他数据源
#[async_trait]
pub trait AdminNotifier: Send + Sync {
    /// 发送通知
    ///
    /// # 参数
    ///
    /// * `notification` - 通知内容，包含数据源ID与错误摘要
    async fn notify(&self, notification: &Notification) -> Result<()>;
}
