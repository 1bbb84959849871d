// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 招聘平台类型
///
/// 每个平台自带一套默认选择器，源配置可以逐字段覆盖
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Workday,
    Greenhouse,
    Lever,
    Indeed,
    Linkedin,
    Occ,
    Computrabajo,
    Generic,
}

impl Platform {
    /// 平台名称
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Workday => "workday",
            Platform::Greenhouse => "greenhouse",
            Platform::Lever => "lever",
            Platform::Indeed => "indeed",
            Platform::Linkedin => "linkedin",
            Platform::Occ => "occ",
            Platform::Computrabajo => "computrabajo",
            Platform::Generic => "generic",
        }
    }

    /// 该平台默认是否需要浏览器渲染
    pub fn requires_browser(&self) -> bool {
        matches!(
            self,
            Platform::Workday | Platform::Linkedin | Platform::Indeed
        )
    }

    /// 平台默认选择器
    pub fn default_selectors(&self) -> FieldSelectors {
        match self {
            Platform::Workday => FieldSelectors {
                item: Some(FieldSelector::css("li.css-1q2dra3")),
                title: Some(FieldSelector::css("h3 a")),
                description: None,
                location: Some(FieldSelector::css("[data-automation-id='locations'] dd")),
                company: None,
                date: Some(FieldSelector::css("[data-automation-id='postedOn'] dd")),
                url: Some(FieldSelector::attr("h3 a", "href")),
            },
            Platform::Greenhouse => FieldSelectors {
                item: Some(FieldSelector::json("jobs")),
                title: Some(FieldSelector::json("title")),
                description: Some(FieldSelector::json("content")),
                location: Some(FieldSelector::json("location.name")),
                company: Some(FieldSelector::json("company_name")),
                date: Some(FieldSelector::json("updated_at")),
                url: Some(FieldSelector::json("absolute_url")),
            },
            Platform::Lever => FieldSelectors {
                item: Some(FieldSelector::json("")),
                title: Some(FieldSelector::json("text")),
                description: Some(FieldSelector::json("descriptionPlain")),
                location: Some(FieldSelector::json("categories.location")),
                company: None,
                date: Some(FieldSelector::json("createdAt")),
                url: Some(FieldSelector::json("hostedUrl")),
            },
            Platform::Indeed => FieldSelectors {
                item: Some(FieldSelector::css("div.job_seen_beacon")),
                title: Some(FieldSelector::css("h2.jobTitle span")),
                description: Some(FieldSelector::css("div.job-snippet")),
                location: Some(FieldSelector::css("[data-testid='text-location']")),
                company: Some(FieldSelector::css("[data-testid='company-name']")),
                date: Some(FieldSelector::css("span.date")),
                url: Some(FieldSelector::attr("h2.jobTitle a", "href")),
            },
            Platform::Linkedin => FieldSelectors {
                item: Some(FieldSelector::css("div.base-search-card")),
                title: Some(FieldSelector::css("h3.base-search-card__title")),
                description: None,
                location: Some(FieldSelector::css("span.job-search-card__location")),
                company: Some(FieldSelector::css("h4.base-search-card__subtitle")),
                date: Some(FieldSelector::attr("time", "datetime")),
                url: Some(FieldSelector::attr("a.base-card__full-link", "href")),
            },
            Platform::Occ => FieldSelectors {
                item: Some(FieldSelector::css("div[id^='jobcard-']")),
                title: Some(FieldSelector::css("h2")),
                description: Some(FieldSelector::css("div.description")),
                location: Some(FieldSelector::css("p.location")),
                company: Some(FieldSelector::css("a.company")),
                date: Some(FieldSelector::css("label.date")),
                url: Some(FieldSelector::attr("a", "href")),
            },
            Platform::Computrabajo => FieldSelectors {
                item: Some(FieldSelector::css("article.box_offer")),
                title: Some(FieldSelector::css("h2 a.js-o-link")),
                description: None,
                location: Some(FieldSelector::css("p.fs16 span.mr10")),
                company: Some(FieldSelector::css("p.fs16 a")),
                date: Some(FieldSelector::css("p.fs13")),
                url: Some(FieldSelector::attr("h2 a.js-o-link", "href")),
            },
            Platform::Generic => FieldSelectors {
                item: Some(FieldSelector::css("article, li.job, div.job")),
                title: Some(FieldSelector::css("h1, h2, h3")),
                description: Some(FieldSelector::css("p")),
                location: Some(FieldSelector::css(".location")),
                company: Some(FieldSelector::css(".company")),
                date: Some(FieldSelector::css("time")),
                url: Some(FieldSelector::attr("a", "href")),
            },
        }
    }
}

/// 字段选择器
///
/// HTML页面使用CSS选择器，JSON接口使用点分路径（数字段表示数组下标）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldSelector {
    Css {
        css: String,
        #[serde(default)]
        attr: Option<String>,
    },
    Json {
        path: String,
    },
}

impl FieldSelector {
    pub fn css(css: &str) -> Self {
        FieldSelector::Css {
            css: css.to_string(),
            attr: None,
        }
    }

    pub fn attr(css: &str, attr: &str) -> Self {
        FieldSelector::Css {
            css: css.to_string(),
            attr: Some(attr.to_string()),
        }
    }

    pub fn json(path: &str) -> Self {
        FieldSelector::Json {
            path: path.to_string(),
        }
    }
}

/// 列表页字段选择器集合
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldSelectors {
    /// 列表项容器
    pub item: Option<FieldSelector>,
    pub title: Option<FieldSelector>,
    pub description: Option<FieldSelector>,
    pub location: Option<FieldSelector>,
    pub company: Option<FieldSelector>,
    pub date: Option<FieldSelector>,
    pub url: Option<FieldSelector>,
}

impl FieldSelectors {
    /// 以`self`为覆盖层合并到`base`之上
    pub fn overlay(&self, base: &FieldSelectors) -> FieldSelectors {
        FieldSelectors {
            item: self.item.clone().or_else(|| base.item.clone()),
            title: self.title.clone().or_else(|| base.title.clone()),
            description: self.description.clone().or_else(|| base.description.clone()),
            location: self.location.clone().or_else(|| base.location.clone()),
            company: self.company.clone().or_else(|| base.company.clone()),
            date: self.date.clone().or_else(|| base.date.clone()),
            url: self.url.clone().or_else(|| base.url.clone()),
        }
    }
}

/// HTTP方法
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

/// 分页参数
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pagination {
    /// 页码参数名（GET写入查询串，POST写入JSON体）
    pub param: String,
    pub start: u32,
    pub step: u32,
    pub max_pages: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            param: "page".to_string(),
            start: 1,
            step: 1,
            max_pages: 1,
        }
    }
}

impl Pagination {
    /// 第`index`页（从0开始）对应的参数值
    pub fn value_for(&self, index: u32) -> u32 {
        self.start.saturating_add(index.saturating_mul(self.step))
    }
}

fn default_rate_class() -> String {
    "default".to_string()
}

fn default_enabled() -> bool {
    true
}

/// 数据源配置
///
/// 由外部管理端维护，核心只读
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub base_url: String,
    pub platform: Platform,
    #[serde(default)]
    pub selectors: FieldSelectors,
    /// 详情页选择器，缺省时沿用列表页选择器
    #[serde(default)]
    pub detail_selectors: Option<FieldSelectors>,
    #[serde(default)]
    pub pagination: Pagination,
    #[serde(default = "default_rate_class")]
    pub rate_class: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub method: HttpMethod,
    #[serde(default)]
    pub payload: Option<Value>,
    #[serde(default)]
    pub requires_browser: Option<bool>,
    /// 公司官网类数据源的默认公司名
    #[serde(default)]
    pub default_company: Option<String>,
}

impl SourceConfig {
    /// 是否需要浏览器渲染
    pub fn needs_browser(&self) -> bool {
        self.requires_browser
            .unwrap_or_else(|| self.platform.requires_browser())
    }

    /// 解析最终生效的选择器（每个源只解析一次）
    pub fn resolve_selectors(&self) -> ResolvedSelectors {
        let listing = self.selectors.overlay(&self.platform.default_selectors());
        let detail = match &self.detail_selectors {
            Some(detail) => detail.overlay(&listing),
            None => listing.clone(),
        };
        ResolvedSelectors {
            platform: self.platform,
            listing,
            detail,
        }
    }
}

/// 已解析的选择器策略
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSelectors {
    pub platform: Platform,
    pub listing: FieldSelectors,
    pub detail: FieldSelectors,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(yaml: &str) -> SourceConfig {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_deserialize_minimal_source() {
        let config = source(
            r#"
id: acme
base_url: https://careers.acme.com/jobs
platform: greenhouse
"#,
        );

        assert!(config.enabled);
        assert_eq!(config.rate_class, "default");
        assert_eq!(config.method, HttpMethod::Get);
        assert_eq!(config.pagination, Pagination::default());
        assert!(!config.needs_browser());
    }

    #[test]
    fn test_selector_override_is_field_by_field() {
        let config = source(
            r#"
id: acme
base_url: https://careers.acme.com/jobs
platform: indeed
selectors:
  title:
    kind: css
    css: h2.custom-title
"#,
        );

        let resolved = config.resolve_selectors();
        assert_eq!(
            resolved.listing.title,
            Some(FieldSelector::css("h2.custom-title"))
        );
        assert_eq!(
            resolved.listing.company,
            Platform::Indeed.default_selectors().company
        );
        assert_eq!(resolved.detail, resolved.listing);
    }

    #[test]
    fn test_detail_selectors_layer_over_listing() {
        let mut config = source(
            r#"
id: acme
base_url: https://careers.acme.com/jobs
platform: generic
"#,
        );
        config.detail_selectors = Some(FieldSelectors {
            description: Some(FieldSelector::css("section.job-body")),
            ..Default::default()
        });

        let resolved = config.resolve_selectors();
        assert_eq!(
            resolved.detail.description,
            Some(FieldSelector::css("section.job-body"))
        );
        assert_eq!(resolved.detail.title, resolved.listing.title);
    }

    #[test]
    fn test_browser_flag_defaults_to_platform() {
        let mut config = source(
            r#"
id: wd
base_url: https://acme.wd5.myworkdayjobs.com/External
platform: workday
"#,
        );
        assert!(config.needs_browser());
        config.requires_browser = Some(false);
        assert!(!config.needs_browser());
    }

    #[test]
    fn test_pagination_values() {
        let pagination = Pagination {
            param: "offset".to_string(),
            start: 0,
            step: 20,
            max_pages: 3,
        };
        assert_eq!(pagination.value_for(0), 0);
        assert_eq!(pagination.value_for(2), 40);
    }
}
