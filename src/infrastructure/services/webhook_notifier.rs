// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::services::notification_service::{AdminNotifier, Notification};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::time::Duration;
use tracing::{error, info};

type HmacSha256 = Hmac<Sha256>;

/// 为负载生成签名：HMAC-SHA256(`{timestamp}.{payload}`)，十六进制
pub fn sign(secret: &str, timestamp: i64, payload: &str) -> String {
    let message = format!("{}.{}", timestamp, payload);
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(message.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// 通过签名Webhook发送管理员通知
pub struct WebhookNotifier {
    /// HTTP 客户端
    client: reqwest::Client,
    url: String,
    /// 签名密钥
    secret: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>, secret: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();

        Self {
            client,
            url: url.into(),
            secret: secret.into(),
        }
    }
}

#[async_trait]
impl AdminNotifier for WebhookNotifier {
    async fn notify(&self, notification: &Notification) -> Result<()> {
        let timestamp = chrono::Utc::now().timestamp();
        let payload = serde_json::to_string(notification)?;
        let signature = sign(&self.secret, timestamp, &payload);

        let response = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .header("X-Jobrs-Signature", signature)
            .header("X-Jobrs-Timestamp", timestamp.to_string())
            .body(payload)
            .send()
            .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(anyhow!(
                "Notification delivery failed with status {}: {}",
                status,
                body
            ))
        }
    }
}

/// 未配置Webhook时只写日志的通知方
pub struct LogNotifier;

#[async_trait]
impl AdminNotifier for LogNotifier {
    async fn notify(&self, notification: &Notification) -> Result<()> {
        error!(
            source = %notification.source_id,
            run_id = %notification.run_id,
            reason = ?notification.reason,
            summary = %notification.summary,
            "Admin notification"
        );
        info!("No notification webhook configured, notification logged only");
        Ok(())
    }
}
