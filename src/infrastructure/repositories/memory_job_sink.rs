// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::job_record::NormalizedRecord;
use crate::domain::repositories::job_repository::{JobSink, StoreOutcome};
use crate::utils::errors::RepositoryError;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;
use uuid::Uuid;

/// 已写入的记录
#[derive(Debug, Clone)]
pub struct StoredJob {
    pub record: NormalizedRecord,
    pub business_unit: String,
    pub run_id: Uuid,
}

#[derive(Default)]
struct Inner {
    jobs: Vec<StoredJob>,
    urls: HashSet<String>,
}

/// 进程内持久化协作方，按URL去重
///
/// 未配置存储接口时使用，也用于测试
#[derive(Default)]
pub struct MemoryJobSink {
    inner: Mutex<Inner>,
}

impl MemoryJobSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前已写入记录的快照
    pub fn jobs(&self) -> Vec<StoredJob> {
        self.inner.lock().jobs.clone()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl JobSink for MemoryJobSink {
    async fn store(
        &self,
        record: &NormalizedRecord,
        business_unit: &str,
        run_id: Uuid,
    ) -> Result<StoreOutcome, RepositoryError> {
        let mut inner = self.inner.lock();
        if !inner.urls.insert(record.url.clone()) {
            return Ok(StoreOutcome::Duplicate);
        }
        inner.jobs.push(StoredJob {
            record: record.clone(),
            business_unit: business_unit.to_string(),
            run_id,
        });
        Ok(StoreOutcome::Inserted)
    }
}
