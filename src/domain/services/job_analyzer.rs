// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::job_record::{JobAnalysis, JobClassification, SalaryRange};
use crate::domain::services::skill_classifier::detect_terms;
use crate::utils::text_processing::fold;
use once_cell::sync::Lazy;
use regex::Regex;

/// 职位文本分析
pub trait JobAnalyzer: Send + Sync {
    fn analyze(&self, title: &str, description: &str) -> JobAnalysis;
}

const AMOUNT: &str = r"(\d{1,3}(?:[,.]\d{3})+|\d+(?:\.\d+)?)\s*(k)?";
const CURRENCY: &str = r"(\$|\busd|\bmxn|\bcop|\bpen|\bclp)";

static SALARY_RANGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"{CURRENCY}?\s?{AMOUNT}\s*(?:-|to|a|hasta)\s*{CURRENCY}?\s?{AMOUNT}"
    ))
    .expect("valid salary range regex")
});
static SALARY_SINGLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"{CURRENCY}\s?{AMOUNT}")).expect("valid salary regex")
});
static EXPERIENCE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{1,2})\s*\+?\s*(?:years?|yrs?|anos?)").expect("valid experience regex")
});
static REQUIREMENT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:\*|•|·|\s-\s|\brequired\b|\bmust\b|\brequisito|\bexperience (?:with|in)\b|\bexperiencia en\b|\bconocimiento)")
        .expect("valid requirement regex")
});

// Salaries below this are ranges of years, hours or headcount.
const MIN_SALARY: f64 = 1_000.0;

const CLASSIFICATIONS: &[(JobClassification, &[&str])] = &[
    (JobClassification::Internship, &["internship", "intern ", "becario", "practicante", "trainee"]),
    (JobClassification::PartTime, &["part-time", "part time", "medio tiempo"]),
    (JobClassification::Contract, &["contractor", "freelance", "por proyecto", "contract role", "fixed-term"]),
    (JobClassification::Temporary, &["temporary", "temporal", "seasonal", "eventual"]),
    (JobClassification::FullTime, &["full-time", "full time", "tiempo completo", "permanent"]),
];

const REMOTE_KEYWORDS: &[&str] = &["remote", "remoto", "home office", "teletrabajo", "work from home"];

const CATEGORIES: &[(&str, &[&str])] = &[
    ("engineering", &["engineer", "developer", "ingeniero", "desarrollador", "software", "devops", "programador"]),
    ("data", &["data", "datos", "analyst", "analista", "bi ", "scientist"]),
    ("management", &["manager", "gerente", "director", "head of", "jefe", "lead"]),
    ("operations", &["operations", "operaciones", "logistics", "logistica", "warehouse", "almacen", "operador", "supply"]),
    ("sales", &["sales", "ventas", "account executive", "ejecutivo de cuenta", "comercial"]),
    ("finance", &["finance", "finanzas", "accounting", "contador", "contable", "auditor"]),
    ("human_resources", &["recruiter", "reclutador", "talent", "recursos humanos", "hr "]),
];

const DEFAULT_CATEGORY: &str = "general";

/// 基于关键词与正则的分析器
#[derive(Debug, Default, Clone, Copy)]
pub struct HeuristicAnalyzer;

impl JobAnalyzer for HeuristicAnalyzer {
    fn analyze(&self, title: &str, description: &str) -> JobAnalysis {
        let title_folded = fold(title);
        let description_folded = fold(description);
        let all = format!("{} {}", title_folded, description_folded);

        let entities: Vec<String> = detect_terms(&format!("{} {}", title, description))
            .into_iter()
            .map(str::to_string)
            .collect();
        let experience_years = extract_experience_years(&all);
        let requirements = REQUIREMENT_RE.find_iter(&description_folded).count();

        JobAnalysis {
            category: categorize(&title_folded, &description_folded).to_string(),
            salary_estimate: extract_salary(&all),
            experience_years,
            complexity_score: complexity(requirements, experience_years, entities.len()),
            classification: classify(&all),
            remote: REMOTE_KEYWORDS.iter().any(|k| all.contains(k)),
            entities,
        }
    }
}

fn parse_amount(number: &str, thousands: Option<regex::Match<'_>>) -> Option<f64> {
    let digits: String = if number.matches([',', '.']).count() >= 1
        && number
            .rsplit([',', '.'])
            .next()
            .is_some_and(|tail| tail.len() == 3)
    {
        number.chars().filter(char::is_ascii_digit).collect()
    } else {
        number.to_string()
    };
    let value: f64 = digits.parse().ok()?;
    Some(if thousands.is_some() { value * 1_000.0 } else { value })
}

/// 抽取薪资区间：`$50,000 - $70,000`、`50k-70k`、`MXN 30,000`
pub fn extract_salary(text: &str) -> Option<SalaryRange> {
    for caps in SALARY_RANGE_RE.captures_iter(text) {
        let low_k = caps.get(3);
        let high_k = caps.get(6);
        let has_currency = caps.get(1).is_some() || caps.get(4).is_some();
        let has_separators = caps[2].contains([',', '.']) && caps[5].contains([',', '.']);
        if !(has_currency || has_separators || low_k.is_some() || high_k.is_some()) {
            continue;
        }
        // "50-70k" means both ends are thousands.
        let (Some(low), Some(high)) = (
            parse_amount(&caps[2], low_k.or(high_k)),
            parse_amount(&caps[5], high_k),
        ) else {
            continue;
        };
        if low >= MIN_SALARY && high >= MIN_SALARY {
            return Some(SalaryRange::new(low, high));
        }
    }

    SALARY_SINGLE_RE
        .captures_iter(text)
        .filter_map(|caps| parse_amount(&caps[2], caps.get(3)))
        .find(|value| *value >= MIN_SALARY)
        .map(|value| SalaryRange::new(value, value))
}

/// 抽取经验年限：`5+ years`、`5 años`
pub fn extract_experience_years(folded: &str) -> Option<u32> {
    EXPERIENCE_RE
        .captures_iter(folded)
        .filter_map(|caps| caps[1].parse::<u32>().ok())
        .max()
}

fn classify(folded: &str) -> JobClassification {
    CLASSIFICATIONS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| folded.contains(k)))
        .map(|(classification, _)| *classification)
        .unwrap_or_default()
}

fn categorize(title: &str, description: &str) -> &'static str {
    let mut best = (DEFAULT_CATEGORY, 0usize);
    for (category, keywords) in CATEGORIES {
        let score: usize = keywords
            .iter()
            .map(|k| title.matches(k).count() * 3 + description.matches(k).count())
            .sum();
        if score > best.1 {
            best = (category, score);
        }
    }
    best.0
}

fn complexity(requirements: usize, years: Option<u32>, entities: usize) -> f32 {
    let requirements = (requirements as f32 / 10.0).min(1.0);
    let years = (years.unwrap_or(0) as f32 / 10.0).min(1.0);
    let entities = (entities as f32 / 10.0).min(1.0);
    (0.4 * requirements + 0.3 * years + 0.3 * entities).clamp(0.0, 1.0)
}
