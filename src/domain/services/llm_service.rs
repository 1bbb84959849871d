// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::services::text_enricher::{
    EnrichedFields, EnrichmentContext, EnrichmentError, TextEnricher,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

/// LLM配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub api_base_url: String,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            api_base_url: "https://api.openai.com/v1".to_string(),
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// LLM服务 - 处理与OpenAI兼容接口的交互
///
/// # 功能
///
/// 根据职位标题与地点生成缺失的职位描述和技能列表
pub struct LLMService {
    api_key: String,
    model: String,
    api_base_url: String,
    client: reqwest::Client,
}

impl LLMService {
    /// 创建LLM服务
    ///
    /// # 返回值
    ///
    /// 未配置API密钥时返回`None`
    pub fn from_config(config: &LlmConfig) -> Result<Option<Self>> {
        let Some(api_key) = config.api_key.clone().filter(|key| !key.is_empty()) else {
            return Ok(None);
        };
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build LLM HTTP client")?;

        Ok(Some(Self {
            api_key,
            model: config.model.clone(),
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
            client,
        }))
    }

    /// 调用chat completions并解析JSON输出
    ///
    /// # 参数
    /// * `system` - 系统提示
    /// * `prompt` - 用户提示
    ///
    /// # 返回值
    /// * `Result<(Value, TokenUsage)>` - 模型返回的JSON对象和令牌使用情况
    pub async fn complete_json(&self, system: &str, prompt: &str) -> Result<(Value, TokenUsage)> {
        let request_body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": prompt }
            ],
            "temperature": 0.2,
            "response_format": { "type": "json_object" }
        });

        let url = format!("{}/chat/completions", self.api_base_url);
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await
            .context("Failed to send request to LLM API")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!(
                "LLM API returned error: {} - {}",
                status,
                error_text
            ));
        }

        let body: Value = response
            .json()
            .await
            .context("Failed to parse LLM API response")?;

        let usage = body
            .get("usage")
            .map(|usage| TokenUsage {
                prompt_tokens: usage["prompt_tokens"].as_u64().unwrap_or(0) as u32,
                completion_tokens: usage["completion_tokens"].as_u64().unwrap_or(0) as u32,
                total_tokens: usage["total_tokens"].as_u64().unwrap_or(0) as u32,
            })
            .unwrap_or_default();

        let content = body["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("Invalid response format from LLM API"))?;

        // Clean up potential markdown code blocks
        let clean_content = content
            .trim()
            .trim_start_matches("```json")
            .trim_start_matches("```")
            .trim_end_matches("```")
            .trim();

        let data = serde_json::from_str::<Value>(clean_content)
            .context("Failed to parse generated JSON content")?;
        Ok((data, usage))
    }
}

fn enrichment_prompt(context: &EnrichmentContext) -> String {
    let mut prompt = format!(
        "Write a job description of about {} words and list exactly {} key skills for the role \"{}\"",
        context.word_target, context.skill_target, context.title
    );
    if let Some(location) = &context.location {
        prompt.push_str(&format!(" located in {}", location));
    }
    if let Some(company) = &context.company {
        prompt.push_str(&format!(" at {}", company));
    }
    prompt.push('.');
    if !context.known_constraints.is_empty() {
        prompt.push_str(&format!(
            " Respect these known facts: {}.",
            context.known_constraints.join("; ")
        ));
    }
    prompt.push_str(
        " Respond with a JSON object {\"description\": string, \"skills\": [string]} and nothing else.",
    );
    prompt
}

#[async_trait]
impl TextEnricher for LLMService {
    async fn fill(&self, context: &EnrichmentContext) -> Result<EnrichedFields, EnrichmentError> {
        let (value, usage) = self
            .complete_json(
                "You write concise, factual job postings. You output only valid JSON.",
                &enrichment_prompt(context),
            )
            .await
            .map_err(|e| EnrichmentError::Upstream(format!("{:#}", e)))?;

        debug!(
            title = %context.title,
            total_tokens = usage.total_tokens,
            "Generated missing description"
        );

        let fields: EnrichedFields = serde_json::from_value(value)
            .map_err(|e| EnrichmentError::InvalidOutput(e.to_string()))?;
        if fields.description.trim().is_empty() {
            return Err(EnrichmentError::InvalidOutput(
                "empty description".to_string(),
            ));
        }
        Ok(fields)
    }
}
