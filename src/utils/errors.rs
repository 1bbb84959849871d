// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use thiserror::Error;

/// 外部协作方（数据源存储、持久化）错误类型
#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("读取失败: {0}")]
    Io(#[from] std::io::Error),

    #[error("配置格式错误: {0}")]
    Format(#[from] serde_yaml::Error),

    #[error("请求失败: {0}")]
    Http(#[from] reqwest::Error),

    #[error("协作方拒绝请求: 状态码 {0}")]
    Rejected(u16),

    #[error("内部错误: {0}")]
    InternalError(String),
}
