// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::job_record::NormalizedRecord;
use crate::domain::repositories::job_repository::{JobSink, StoreOutcome};
use crate::utils::errors::RepositoryError;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;
use std::time::Duration;
use uuid::Uuid;

#[derive(Serialize)]
struct IngestRequest<'a> {
    record: &'a NormalizedRecord,
    business_unit: &'a str,
    run_id: Uuid,
}

/// 通过HTTP接口写入存储层的持久化协作方
///
/// `201` 表示新记录，`200`/`409` 表示存储层已去重
pub struct HttpJobSink {
    client: reqwest::Client,
    ingest_url: String,
    api_token: Option<String>,
}

impl HttpJobSink {
    pub fn new(ingest_url: impl Into<String>, api_token: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .unwrap_or_default();

        Self {
            client,
            ingest_url: ingest_url.into(),
            api_token,
        }
    }
}

#[async_trait]
impl JobSink for HttpJobSink {
    async fn store(
        &self,
        record: &NormalizedRecord,
        business_unit: &str,
        run_id: Uuid,
    ) -> Result<StoreOutcome, RepositoryError> {
        let mut request = self.client.post(&self.ingest_url).json(&IngestRequest {
            record,
            business_unit,
            run_id,
        });
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        match response.status() {
            StatusCode::CREATED => Ok(StoreOutcome::Inserted),
            StatusCode::OK | StatusCode::CONFLICT => Ok(StoreOutcome::Duplicate),
            status => Err(RepositoryError::Rejected(status.as_u16())),
        }
    }
}
