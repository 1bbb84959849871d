// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::job_record::RawRecord;
use crate::domain::models::source_config::{FieldSelector, FieldSelectors};
use crate::engines::traits::EngineError;
use crate::utils::text_processing::collapse_whitespace;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use url::Url;

/// 从页面内容抽取结构化字段
///
/// 选择器是声明式的；某字段没有选择器或未命中时该字段为空，而不是错误
pub struct Extractor<'a> {
    selectors: &'a FieldSelectors,
    base_url: Option<Url>,
    source_id: &'a str,
}

impl<'a> Extractor<'a> {
    pub fn new(selectors: &'a FieldSelectors, base_url: &str, source_id: &'a str) -> Self {
        Self {
            selectors,
            base_url: Url::parse(base_url).ok(),
            source_id,
        }
    }

    fn is_json(&self) -> bool {
        matches!(
            self.selectors.item.as_ref().or(self.selectors.title.as_ref()),
            Some(FieldSelector::Json { .. })
        )
    }

    /// 抽取列表页中的全部条目
    pub fn extract_listing(&self, content: &str) -> Result<Vec<RawRecord>, EngineError> {
        if self.is_json() {
            self.listing_from_json(content)
        } else {
            self.listing_from_html(content)
        }
    }

    /// 将整页作为单个条目抽取（详情页）
    pub fn extract_detail(&self, content: &str) -> Result<RawRecord, EngineError> {
        if self.is_json() {
            let root: Value = serde_json::from_str(content)
                .map_err(|e| EngineError::Parse(format!("Invalid JSON detail page: {}", e)))?;
            Ok(self.record_from_json(&root))
        } else {
            let document = Html::parse_document(content);
            self.record_from_element(document.root_element())
        }
    }

    fn listing_from_json(&self, content: &str) -> Result<Vec<RawRecord>, EngineError> {
        let root: Value = serde_json::from_str(content)
            .map_err(|e| EngineError::Parse(format!("Invalid JSON listing: {}", e)))?;

        let items = match &self.selectors.item {
            Some(FieldSelector::Json { path }) => lookup(&root, path),
            _ => Some(&root),
        };

        Ok(match items {
            Some(Value::Array(items)) => items.iter().map(|item| self.record_from_json(item)).collect(),
            Some(item @ Value::Object(_)) => vec![self.record_from_json(item)],
            _ => Vec::new(),
        })
    }

    fn record_from_json(&self, item: &Value) -> RawRecord {
        let field = |selector: &Option<FieldSelector>| match selector {
            Some(FieldSelector::Json { path }) => lookup(item, path).and_then(json_text),
            _ => None,
        };

        RawRecord {
            source_id: self.source_id.to_string(),
            title: field(&self.selectors.title),
            description: field(&self.selectors.description),
            location: field(&self.selectors.location),
            company: field(&self.selectors.company),
            posted_date: field(&self.selectors.date),
            url: field(&self.selectors.url).map(|url| self.resolve_url(&url)),
        }
    }

    fn listing_from_html(&self, content: &str) -> Result<Vec<RawRecord>, EngineError> {
        let document = Html::parse_document(content);
        match &self.selectors.item {
            Some(FieldSelector::Css { css, .. }) => {
                let item_selector = parse_selector(css)?;
                document
                    .select(&item_selector)
                    .map(|element| self.record_from_element(element))
                    .collect()
            }
            _ => Ok(vec![self.record_from_element(document.root_element())?]),
        }
    }

    fn record_from_element(&self, element: ElementRef<'_>) -> Result<RawRecord, EngineError> {
        let field = |selector: &Option<FieldSelector>| -> Result<Option<String>, EngineError> {
            match selector {
                Some(FieldSelector::Css { css, attr }) => {
                    let selector = parse_selector(css)?;
                    Ok(element
                        .select(&selector)
                        .next()
                        .and_then(|found| element_value(found, attr.as_deref())))
                }
                _ => Ok(None),
            }
        };

        Ok(RawRecord {
            source_id: self.source_id.to_string(),
            title: field(&self.selectors.title)?,
            description: field(&self.selectors.description)?,
            location: field(&self.selectors.location)?,
            company: field(&self.selectors.company)?,
            posted_date: field(&self.selectors.date)?,
            url: field(&self.selectors.url)?.map(|url| self.resolve_url(&url)),
        })
    }

    fn resolve_url(&self, raw: &str) -> String {
        match &self.base_url {
            Some(base) => base
                .join(raw)
                .map(|url| url.to_string())
                .unwrap_or_else(|_| raw.to_string()),
            None => raw.to_string(),
        }
    }
}

fn parse_selector(css: &str) -> Result<Selector, EngineError> {
    Selector::parse(css).map_err(|e| EngineError::Parse(format!("Invalid selector '{}': {}", css, e)))
}

fn element_value(element: ElementRef<'_>, attr: Option<&str>) -> Option<String> {
    let value = match attr {
        Some(attr) => element.value().attr(attr).map(str::to_string)?,
        None => element.text().collect::<Vec<_>>().join(" "),
    };
    let value = collapse_whitespace(&value);
    (!value.is_empty()).then_some(value)
}

/// 按点分路径查找JSON值，数字段索引数组，空路径返回根
fn lookup<'v>(root: &'v Value, path: &str) -> Option<&'v Value> {
    if path.is_empty() {
        return Some(root);
    }
    path.split('.').try_fold(root, |current, segment| match current {
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        Value::Object(map) => map.get(segment),
        _ => None,
    })
}

fn json_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Array(items) => items
            .iter()
            .filter_map(json_text)
            .collect::<Vec<_>>()
            .join(", "),
        Value::Object(_) | Value::Null => return None,
    };
    (!text.is_empty()).then_some(text)
}
