// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::source_config::SourceConfig;
use crate::domain::repositories::source_config_repository::SourceConfigRepository;
use crate::utils::errors::RepositoryError;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct SourceFile {
    #[serde(default)]
    sources: Vec<SourceConfig>,
}

enum Backing {
    File(PathBuf),
    Static(Vec<SourceConfig>),
}

/// 基于YAML文件的数据源仓库
///
/// 文件在每次读取时重新加载，管理端的修改在下一次运行时生效
pub struct YamlSourceRepository {
    backing: Backing,
}

impl YamlSourceRepository {
    /// 从文件创建仓库
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            backing: Backing::File(path.into()),
        }
    }

    /// 使用固定的数据源列表创建仓库
    pub fn from_sources(sources: Vec<SourceConfig>) -> Self {
        Self {
            backing: Backing::Static(sources),
        }
    }

    /// 解析YAML内容
    ///
    /// # 返回值
    ///
    /// * `Err(RepositoryError::Format)` - YAML无法解析
    /// * `Err(RepositoryError::InternalError)` - 存在重复的数据源ID
    pub fn parse(content: &str) -> Result<Vec<SourceConfig>, RepositoryError> {
        let file: SourceFile = serde_yaml::from_str(content)?;
        let mut seen = HashSet::new();
        for source in &file.sources {
            if !seen.insert(source.id.as_str()) {
                return Err(RepositoryError::InternalError(format!(
                    "duplicate source id '{}'",
                    source.id
                )));
            }
        }
        Ok(file.sources)
    }
}

#[async_trait]
impl SourceConfigRepository for YamlSourceRepository {
    async fn list(&self) -> Result<Vec<SourceConfig>, RepositoryError> {
        match &self.backing {
            Backing::Static(sources) => Ok(sources.clone()),
            Backing::File(path) => {
                let content = tokio::fs::read_to_string(path).await?;
                let sources = Self::parse(&content)?;
                debug!(path = %path.display(), count = sources.len(), "Loaded source configs");
                Ok(sources)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::source_config::{FieldSelector, HttpMethod, Platform};
    use std::io::Write;

    const SOURCES: &str = r#"
sources:
  - id: acme
    name: ACME Careers
    base_url: https://boards-api.greenhouse.io/v1/boards/acme/jobs
    platform: greenhouse
    rate_class: ats
  - id: occ-logistica
    base_url: https://www.occ.com.mx/empleos/de-logistica/
    platform: occ
    enabled: false
    pagination:
      param: page
      max_pages: 3
  - id: widgets
    base_url: https://widgets.example.com/api/search
    platform: generic
    method: POST
    payload:
      query: ""
    default_company: Widgets Inc
    selectors:
      item: { kind: json, path: "results" }
      title: { kind: json, path: "name" }
      url: { kind: css, css: "a.apply", attr: href }
"#;

    #[tokio::test]
    async fn test_loads_sources_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SOURCES.as_bytes()).unwrap();
        let repo = YamlSourceRepository::new(file.path());

        let all = repo.list().await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].platform, Platform::Greenhouse);
        assert_eq!(all[0].rate_class, "ats");
        assert_eq!(all[1].pagination.max_pages, 3);
        assert_eq!(all[2].method, HttpMethod::Post);
        assert_eq!(all[2].selectors.title, Some(FieldSelector::json("name")));
        assert_eq!(all[2].selectors.url, Some(FieldSelector::attr("a.apply", "href")));

        let enabled = repo.list_enabled().await.unwrap();
        assert_eq!(enabled.len(), 2);
        assert!(repo.find_by_id("widgets").await.unwrap().is_some());
        assert!(repo.find_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_file_is_reloaded_on_each_read() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "sources: []").unwrap();
        let repo = YamlSourceRepository::new(file.path());
        assert!(repo.list().await.unwrap().is_empty());

        std::fs::write(file.path(), SOURCES).unwrap();
        assert_eq!(repo.list().await.unwrap().len(), 3);
    }

    #[test]
    fn test_duplicate_ids_are_rejected() {
        let yaml = r#"
sources:
  - { id: a, base_url: "https://a.example.com", platform: generic }
  - { id: a, base_url: "https://b.example.com", platform: generic }
"#;
        assert!(matches!(
            YamlSourceRepository::parse(yaml),
            Err(RepositoryError::InternalError(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let repo = YamlSourceRepository::new("/nonexistent/jobrs/sources.yaml");
        assert!(matches!(repo.list().await, Err(RepositoryError::Io(_))));
    }
}
