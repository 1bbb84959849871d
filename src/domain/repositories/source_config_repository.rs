// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::source_config::SourceConfig;
use crate::utils::errors::RepositoryError;
use async_trait::async_trait;

/// 数据源配置仓库特质
///
/// 配置由外部管理端创建和编辑，核心只读
#[async_trait]
pub trait SourceConfigRepository: Send + Sync {
    /// 获取全部数据源
    async fn list(&self) -> Result<Vec<SourceConfig>, RepositoryError>;

    /// 获取启用的数据源
    async fn list_enabled(&self) -> Result<Vec<SourceConfig>, RepositoryError> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .filter(|source| source.enabled)
            .collect())
    }

    /// 根据ID查找数据源
    async fn find_by_id(&self, id: &str) -> Result<Option<SourceConfig>, RepositoryError> {
        Ok(self.list().await?.into_iter().find(|source| source.id == id))
    }
}
