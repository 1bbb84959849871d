// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::utils::text_processing::fold;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, HashSet};

/// 技能词条：规范名、类别、额外别名
struct SkillTerm {
    canonical: &'static str,
    category: &'static str,
    aliases: &'static [&'static str],
}

const LEXICON: &[SkillTerm] = &[
    SkillTerm { canonical: "python", category: "programming", aliases: &[] },
    SkillTerm { canonical: "java", category: "programming", aliases: &[] },
    SkillTerm { canonical: "javascript", category: "programming", aliases: &["js", "ecmascript"] },
    SkillTerm { canonical: "typescript", category: "programming", aliases: &["ts"] },
    SkillTerm { canonical: "rust", category: "programming", aliases: &[] },
    SkillTerm { canonical: "go", category: "programming", aliases: &["golang"] },
    SkillTerm { canonical: "c#", category: "programming", aliases: &["csharp", "c sharp"] },
    SkillTerm { canonical: "c++", category: "programming", aliases: &["cpp"] },
    SkillTerm { canonical: ".net", category: "programming", aliases: &["dotnet"] },
    SkillTerm { canonical: "php", category: "programming", aliases: &[] },
    SkillTerm { canonical: "react", category: "programming", aliases: &["reactjs", "react.js"] },
    SkillTerm { canonical: "node.js", category: "programming", aliases: &["node", "nodejs"] },
    SkillTerm { canonical: "sql", category: "data", aliases: &["mysql", "postgresql", "postgres"] },
    SkillTerm { canonical: "power bi", category: "data", aliases: &["powerbi"] },
    SkillTerm { canonical: "tableau", category: "data", aliases: &[] },
    SkillTerm { canonical: "excel", category: "data", aliases: &["microsoft excel"] },
    SkillTerm { canonical: "machine learning", category: "data", aliases: &["ml"] },
    SkillTerm { canonical: "spark", category: "data", aliases: &["pyspark"] },
    SkillTerm { canonical: "aws", category: "cloud_devops", aliases: &["amazon web services"] },
    SkillTerm { canonical: "azure", category: "cloud_devops", aliases: &[] },
    SkillTerm { canonical: "gcp", category: "cloud_devops", aliases: &["google cloud"] },
    SkillTerm { canonical: "docker", category: "cloud_devops", aliases: &[] },
    SkillTerm { canonical: "kubernetes", category: "cloud_devops", aliases: &["k8s"] },
    SkillTerm { canonical: "terraform", category: "cloud_devops", aliases: &[] },
    SkillTerm { canonical: "ci/cd", category: "cloud_devops", aliases: &["cicd"] },
    SkillTerm { canonical: "project management", category: "management", aliases: &["gestion de proyectos"] },
    SkillTerm { canonical: "scrum", category: "management", aliases: &[] },
    SkillTerm { canonical: "agile", category: "management", aliases: &["agil"] },
    SkillTerm { canonical: "pmp", category: "management", aliases: &[] },
    SkillTerm { canonical: "budgeting", category: "management", aliases: &["presupuestos"] },
    SkillTerm { canonical: "people management", category: "management", aliases: &["manejo de personal"] },
    SkillTerm { canonical: "english", category: "languages", aliases: &["ingles"] },
    SkillTerm { canonical: "spanish", category: "languages", aliases: &["espanol"] },
    SkillTerm { canonical: "portuguese", category: "languages", aliases: &["portugues"] },
    SkillTerm { canonical: "bilingual", category: "languages", aliases: &["bilingue"] },
    SkillTerm { canonical: "communication", category: "soft_skills", aliases: &["comunicacion"] },
    SkillTerm { canonical: "leadership", category: "soft_skills", aliases: &["liderazgo"] },
    SkillTerm { canonical: "teamwork", category: "soft_skills", aliases: &["trabajo en equipo"] },
    SkillTerm { canonical: "negotiation", category: "soft_skills", aliases: &["negociacion"] },
    SkillTerm { canonical: "sap", category: "operations", aliases: &[] },
    SkillTerm { canonical: "logistics", category: "operations", aliases: &["logistica"] },
    SkillTerm { canonical: "inventory", category: "operations", aliases: &["inventarios"] },
    SkillTerm { canonical: "supply chain", category: "operations", aliases: &["cadena de suministro"] },
    SkillTerm { canonical: "lean", category: "operations", aliases: &["lean manufacturing"] },
    SkillTerm { canonical: "forklift", category: "operations", aliases: &["montacargas"] },
];

const OTHER_CATEGORY: &str = "other";

/// 词条无歧义边界：前后不能紧邻字母数字或 + # .
fn term_pattern(term: &str) -> String {
    format!(r"(?:^|[^a-z0-9+#.])({})(?:$|[^a-z0-9+#])", regex::escape(term))
}

struct CompiledTerm {
    canonical: &'static str,
    patterns: Vec<Regex>,
}

// Two-letter terms ("ts", "ml", "go") only match as explicit skills, never in prose.
const TEXT_DETECTION_MIN_LEN: usize = 3;

static COMPILED: Lazy<Vec<CompiledTerm>> = Lazy::new(|| {
    LEXICON
        .iter()
        .map(|term| CompiledTerm {
            canonical: term.canonical,
            patterns: std::iter::once(term.canonical)
                .chain(term.aliases.iter().copied())
                .filter(|t| t.len() >= TEXT_DETECTION_MIN_LEN || t.contains(['+', '#']))
                .filter_map(|t| Regex::new(&term_pattern(t)).ok())
                .collect(),
        })
        .collect()
});

/// 技能规范化：小写、去重音、别名归并
pub fn normalize_skill(raw: &str) -> String {
    let folded = fold(raw);
    let trimmed = folded.trim().trim_matches([',', ';']).trim_end_matches('.');
    let collapsed = trimmed.split_whitespace().collect::<Vec<_>>().join(" ");
    LEXICON
        .iter()
        .find(|term| term.canonical == collapsed || term.aliases.contains(&collapsed.as_str()))
        .map(|term| term.canonical.to_string())
        .unwrap_or(collapsed)
}

/// 技能所属类别
pub fn category_of(skill: &str) -> &'static str {
    LEXICON
        .iter()
        .find(|term| term.canonical == skill)
        .map(|term| term.category)
        .unwrap_or(OTHER_CATEGORY)
}

/// 在自由文本中检测词条，按词表顺序返回规范名
pub fn detect_terms(text: &str) -> Vec<&'static str> {
    let folded = fold(text);
    COMPILED
        .iter()
        .filter(|term| term.patterns.iter().any(|p| p.is_match(&folded)))
        .map(|term| term.canonical)
        .collect()
}

/// 技能分类结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkillSet {
    pub skills: Vec<String>,
    pub categories: BTreeMap<String, Vec<String>>,
}

/// 合并给定技能与文本中检测到的词条，去重后分组
pub fn classify_skills(given: &[String], text: &str) -> SkillSet {
    let mut seen = HashSet::new();
    let mut skills = Vec::new();

    let detected = detect_terms(text).into_iter().map(str::to_string);
    for skill in given.iter().map(|s| normalize_skill(s)).chain(detected) {
        if !skill.is_empty() && seen.insert(skill.clone()) {
            skills.push(skill);
        }
    }

    let mut categories: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for skill in &skills {
        categories
            .entry(category_of(skill).to_string())
            .or_default()
            .push(skill.clone());
    }

    SkillSet { skills, categories }
}
