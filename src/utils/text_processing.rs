// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

//! 文本清洗工具
//!
//! HTML实体解码、标签剥离、空白折叠以及占位值检测

use deunicode::deunicode;
use once_cell::sync::Lazy;
use regex::Regex;

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").expect("valid tag regex"));
static BLOCK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<(script|style|noscript)[^>]*>.*?</(script|style|noscript)>")
        .expect("valid block regex")
});
static WS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

const PLACEHOLDERS: &[&str] = &[
    "",
    "n/a",
    "na",
    "-",
    "tbd",
    "null",
    "none",
    "undefined",
    "no description",
    "sin descripcion",
    "see description",
    "...",
];

/// 折叠连续空白并去除首尾空白
pub fn collapse_whitespace(text: &str) -> String {
    WS_RE.replace_all(text.trim(), " ").into_owned()
}

/// 剥离HTML标签（含script/style块）
pub fn strip_tags(text: &str) -> String {
    let without_blocks = BLOCK_RE.replace_all(text, " ");
    TAG_RE.replace_all(&without_blocks, " ").into_owned()
}

/// 完整清洗：实体解码、剥离标签、折叠空白
///
/// Greenhouse等接口返回转义后的HTML，所以解码发生在剥离之前，剥离后再解码一次
pub fn clean_text(text: &str) -> String {
    let decoded = html_escape::decode_html_entities(text);
    let stripped = strip_tags(&decoded);
    let decoded = html_escape::decode_html_entities(&stripped);
    collapse_whitespace(&decoded)
}

/// 是否为占位值
pub fn is_placeholder(text: &str) -> bool {
    let folded = fold(text);
    let normalized = folded.trim().trim_end_matches('.').trim();
    PLACEHOLDERS.contains(&folded.trim()) || PLACEHOLDERS.contains(&normalized)
}

/// 小写并去除重音
pub fn fold(text: &str) -> String {
    deunicode(text).to_lowercase()
}

/// 清洗可选字段：清洗后为空或为占位值时返回None
pub fn clean_field(value: Option<&str>) -> Option<String> {
    let cleaned = clean_text(value?);
    if is_placeholder(&cleaned) {
        None
    } else {
        Some(cleaned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_text_handles_escaped_html() {
        let raw = "&lt;p&gt;Build &amp; run  data\n\npipelines&lt;/p&gt;<script>x()</script>";
        assert_eq!(clean_text(raw), "Build & run data pipelines");
    }

    #[test]
    fn test_placeholders() {
        for value in ["", "  N/A ", "TBD", "-", "Sin descripción", "No description.", "..."] {
            assert!(is_placeholder(value), "{value:?}");
        }
        assert!(!is_placeholder("Senior Analyst"));
    }

    #[test]
    fn test_clean_field() {
        assert_eq!(clean_field(Some("<b>Monterrey</b>")), Some("Monterrey".to_string()));
        assert_eq!(clean_field(Some("null")), None);
        assert_eq!(clean_field(None), None);
    }

    #[test]
    fn test_fold_removes_accents() {
        assert_eq!(fold("Ciudad de México"), "ciudad de mexico");
    }
}
