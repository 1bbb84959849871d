// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::scrape_run::RunSummary;
use crate::presentation::errors::AppError;
use crate::presentation::routes::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use tracing::info;

/// 触发一次全量抓取
///
/// 若已有运行在进行中，则等待其结束后再开始
///
/// # 返回值
///
/// 返回本次运行的汇总
pub async fn run_all(State(state): State<AppState>) -> Result<Json<RunSummary>, AppError> {
    info!("Full run requested over HTTP");
    let summary = state.orchestrator.run_all().await?;
    Ok(Json(summary))
}

/// 抓取单个数据源
///
/// # 参数
///
/// * `source_id` - 数据源ID
///
/// # 返回值
///
/// 数据源不存在时返回404
pub async fn run_one(
    State(state): State<AppState>,
    Path(source_id): Path<String>,
) -> Result<Json<RunSummary>, AppError> {
    info!(source_id = %source_id, "Single source run requested over HTTP");
    let summary = state.orchestrator.run_one(&source_id).await?;
    Ok(Json(summary))
}
