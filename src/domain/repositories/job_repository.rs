// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::job_record::NormalizedRecord;
use crate::utils::errors::RepositoryError;
use async_trait::async_trait;
use uuid::Uuid;

/// 写入结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOutcome {
    /// 新记录
    Inserted,
    /// 已存在（由持久化方去重）
    Duplicate,
}

/// 职位持久化协作方
///
/// 负责去重与存储，核心对每条记录只调用一次，失败仅记录日志不重试
#[async_trait]
pub trait JobSink: Send + Sync {
    async fn store(
        &self,
        record: &NormalizedRecord,
        business_unit: &str,
        run_id: Uuid,
    ) -> Result<StoreOutcome, RepositoryError>;
}
