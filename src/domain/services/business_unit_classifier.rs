// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::job_record::{Industry, SalaryRange};
use crate::utils::text_processing::fold;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// 业务单元分类配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BusinessUnitConfig {
    /// 所有单元得分为零时使用的单元
    pub default_unit: String,
    /// 可选的YAML权重文件，缺省时使用内置五单元配置
    pub profiles_path: Option<PathBuf>,
}

impl Default for BusinessUnitConfig {
    fn default() -> Self {
        Self {
            default_unit: "operations_staffing".to_string(),
            profiles_path: None,
        }
    }
}

/// 分类器错误
#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("Failed to read business unit profiles: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid business unit profiles: {0}")]
    Format(#[from] serde_yaml::Error),
    #[error("Default business unit '{0}' is not defined in the profiles")]
    UnknownDefault(String),
}

/// 由资历分数推导出的职位层级
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionLevel {
    Entry,
    Operational,
    MidManagement,
    Executive,
}

impl PositionLevel {
    /// 资历分数到层级的映射
    ///
    /// 没有资历关键词（分数为0）的职位视为操作层
    pub fn from_seniority(score: u32) -> Self {
        match score {
            80.. => PositionLevel::Executive,
            50..=79 => PositionLevel::MidManagement,
            1..=15 => PositionLevel::Entry,
            _ => PositionLevel::Operational,
        }
    }
}

/// 资历关键词
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeniorityTerm {
    pub keyword: String,
    pub weight: u32,
}

/// 某一层级下各评分项的乘数
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelWeights {
    pub hard_skill: f64,
    pub seniority: f64,
    pub industry: f64,
    pub salary: f64,
    pub experience: f64,
    pub location: f64,
}

impl Default for LevelWeights {
    fn default() -> Self {
        Self {
            hard_skill: 1.0,
            seniority: 1.0,
            industry: 1.0,
            salary: 1.0,
            experience: 1.0,
            location: 1.0,
        }
    }
}

/// 单个业务单元的评分配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitProfile {
    pub id: String,
    /// 命中关键词数 × `hard_skill_weight`
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default = "default_hard_skill_weight")]
    pub hard_skill_weight: f64,
    /// 仅在标题命中资历关键词时生效
    #[serde(default)]
    pub seniority_bonus: BTreeMap<PositionLevel, f64>,
    #[serde(default)]
    pub industry_bonus: BTreeMap<Industry, f64>,
    /// 按 `salary_thresholds` 分出的四档
    #[serde(default)]
    pub salary_bonus: [f64; 4],
    /// 按 `experience_thresholds` 分出的四档
    #[serde(default)]
    pub experience_bonus: [f64; 4],
    /// 在地点与描述中检索的跨境/迁移类词汇
    #[serde(default)]
    pub location_keywords: Vec<String>,
    #[serde(default)]
    pub location_weight: f64,
    #[serde(default)]
    pub level_weights: BTreeMap<PositionLevel, LevelWeights>,
}

fn default_hard_skill_weight() -> f64 {
    1.0
}

/// 完整的静态评分配置，`units` 的顺序即平局时的优先级
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierProfiles {
    pub seniority: Vec<SeniorityTerm>,
    pub industries: BTreeMap<Industry, Vec<String>>,
    pub salary_thresholds: [f64; 3],
    pub experience_thresholds: [u32; 3],
    pub units: Vec<UnitProfile>,
}

/// 分类结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assignment {
    pub unit: String,
    pub level: PositionLevel,
    pub seniority: u32,
    pub industry: Option<Industry>,
    /// 按优先级顺序排列的各单元得分
    pub scores: Vec<(String, f64)>,
    /// 所有单元得分为零，使用了默认单元
    pub ambiguous: bool,
}

/// 归一化后的检索文本：折叠重音、小写、非字母数字替换为单个空格
struct Haystack(String);

impl Haystack {
    fn new(parts: &[&str]) -> Self {
        Haystack(format!(" {} ", normalize_phrase(&parts.join(" "))))
    }

    fn contains(&self, phrase: &str) -> bool {
        !phrase.is_empty() && self.0.contains(&format!(" {} ", phrase))
    }

    fn count(&self, phrase: &str) -> usize {
        if phrase.is_empty() {
            return 0;
        }
        self.0.matches(&format!(" {} ", phrase)).count()
    }
}

fn normalize_phrase(text: &str) -> String {
    fold(text)
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn band<T: PartialOrd + Copy>(value: T, thresholds: &[T; 3]) -> usize {
    thresholds.iter().take_while(|t| value >= **t).count()
}

/// 业务单元分类器
///
/// 纯函数式评分：相同输入与相同配置永远得到相同结果
#[derive(Debug, Clone)]
pub struct BusinessUnitClassifier {
    profiles: ClassifierProfiles,
    default_unit: String,
}

impl BusinessUnitClassifier {
    /// 创建分类器
    ///
    /// # 参数
    ///
    /// * `profiles` - 评分配置，关键词会被预先归一化
    /// * `default_unit` - 必须是 `profiles.units` 中的单元
    pub fn new(
        mut profiles: ClassifierProfiles,
        default_unit: impl Into<String>,
    ) -> Result<Self, ClassifierError> {
        let default_unit = default_unit.into();
        if !profiles.units.iter().any(|unit| unit.id == default_unit) {
            return Err(ClassifierError::UnknownDefault(default_unit));
        }

        // Highest tier first so the first title match is the maximum.
        profiles
            .seniority
            .sort_by(|a, b| b.weight.cmp(&a.weight));
        for term in &mut profiles.seniority {
            term.keyword = normalize_phrase(&term.keyword);
        }
        for keywords in profiles.industries.values_mut() {
            normalize_all(keywords);
        }
        for unit in &mut profiles.units {
            normalize_all(&mut unit.keywords);
            normalize_all(&mut unit.location_keywords);
        }

        Ok(Self {
            profiles,
            default_unit,
        })
    }

    /// 根据配置创建分类器
    pub fn from_config(config: &BusinessUnitConfig) -> Result<Self, ClassifierError> {
        let profiles = match &config.profiles_path {
            Some(path) => load_profiles(path)?,
            None => ClassifierProfiles::default(),
        };
        Self::new(profiles, config.default_unit.clone())
    }

    pub fn profiles(&self) -> &ClassifierProfiles {
        &self.profiles
    }

    /// 标题中命中的最高资历权重，没有命中时为0
    pub fn seniority_score(&self, title: &str) -> u32 {
        let haystack = Haystack::new(&[title]);
        self.profiles
            .seniority
            .iter()
            .find(|term| haystack.contains(&term.keyword))
            .map(|term| term.weight)
            .unwrap_or(0)
    }

    /// 主导行业：命中次数最多的类别，并列时没有主导行业
    pub fn dominant_industry(&self, title: &str, description: Option<&str>) -> Option<Industry> {
        let haystack = Haystack::new(&[title, description.unwrap_or_default()]);
        let counts: Vec<(Industry, usize)> = Industry::ALL
            .iter()
            .map(|industry| {
                let hits = self
                    .profiles
                    .industries
                    .get(industry)
                    .map(|keywords| keywords.iter().map(|k| haystack.count(k)).sum())
                    .unwrap_or(0);
                (*industry, hits)
            })
            .collect();

        let best = counts.iter().map(|(_, hits)| *hits).max().unwrap_or(0);
        let mut leaders = counts.iter().filter(|(_, hits)| *hits == best);
        match (best, leaders.next(), leaders.next()) {
            (0, _, _) => None,
            (_, Some((industry, _)), None) => Some(*industry),
            _ => None,
        }
    }

    /// 为职位分配业务单元
    ///
    /// # 参数
    ///
    /// * `title` - 职位标题
    /// * `description` - 职位描述
    /// * `salary` - 薪资范围，按中位数分档
    /// * `experience_years` - 经验年限
    /// * `location` - 工作地点
    ///
    /// # 返回值
    ///
    /// 得分最高的单元；并列时按配置顺序取靠前者；全部为零时返回默认单元
    pub fn assign(
        &self,
        title: &str,
        description: Option<&str>,
        salary: Option<&SalaryRange>,
        experience_years: Option<u32>,
        location: Option<&str>,
    ) -> Assignment {
        let seniority = self.seniority_score(title);
        let level = PositionLevel::from_seniority(seniority);
        let industry = self.dominant_industry(title, description);

        let text = Haystack::new(&[title, description.unwrap_or_default()]);
        let place = Haystack::new(&[location.unwrap_or_default(), description.unwrap_or_default()]);
        let salary_band = salary.map(|s| band(s.midpoint(), &self.profiles.salary_thresholds));
        let experience_band =
            experience_years.map(|years| band(years, &self.profiles.experience_thresholds));

        let scores: Vec<(String, f64)> = self
            .profiles
            .units
            .iter()
            .map(|unit| {
                let weights = unit.level_weights.get(&level).copied().unwrap_or_default();

                let keyword_hits = unit.keywords.iter().filter(|k| text.contains(k)).count();
                let location_hits = unit
                    .location_keywords
                    .iter()
                    .filter(|k| place.contains(k))
                    .count();
                let seniority_bonus = if seniority > 0 {
                    unit.seniority_bonus.get(&level).copied().unwrap_or(0.0)
                } else {
                    0.0
                };
                let industry_bonus = industry
                    .and_then(|i| unit.industry_bonus.get(&i).copied())
                    .unwrap_or(0.0);
                let salary_bonus = salary_band.map(|b| unit.salary_bonus[b]).unwrap_or(0.0);
                let experience_bonus = experience_band
                    .map(|b| unit.experience_bonus[b])
                    .unwrap_or(0.0);

                let score = weights.hard_skill * keyword_hits as f64 * unit.hard_skill_weight
                    + weights.seniority * seniority_bonus
                    + weights.industry * industry_bonus
                    + weights.salary * salary_bonus
                    + weights.experience * experience_bonus
                    + weights.location * location_hits as f64 * unit.location_weight;
                (unit.id.clone(), score)
            })
            .collect();

        let mut best: Option<&(String, f64)> = None;
        for entry in &scores {
            // Strict comparison keeps the earlier unit on ties.
            match best {
                Some(leader) if entry.1 <= leader.1 => {}
                _ if entry.1 > 0.0 => best = Some(entry),
                _ => {}
            }
        }

        let (unit, ambiguous) = match best {
            Some((unit, _)) => (unit.clone(), false),
            None => {
                debug!(title = %title, default_unit = %self.default_unit, "Business unit ambiguous, using default");
                (self.default_unit.clone(), true)
            }
        };

        Assignment {
            unit,
            level,
            seniority,
            industry,
            scores,
            ambiguous,
        }
    }
}

fn normalize_all(keywords: &mut [String]) {
    for keyword in keywords.iter_mut() {
        *keyword = normalize_phrase(keyword);
    }
}

/// 从YAML文件加载评分配置
pub fn load_profiles(path: &Path) -> Result<ClassifierProfiles, ClassifierError> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_yaml::from_str(&content)?)
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn levels<const N: usize>(entries: [(PositionLevel, f64); N]) -> BTreeMap<PositionLevel, f64> {
    entries.into_iter().collect()
}

impl Default for ClassifierProfiles {
    fn default() -> Self {
        use PositionLevel::*;

        let seniority = [
            ("chief", 100),
            ("ceo", 100),
            ("cfo", 100),
            ("cto", 100),
            ("coo", 100),
            ("president", 95),
            ("vice president", 90),
            ("vp", 90),
            ("director", 85),
            ("directora", 85),
            ("head of", 80),
            ("senior manager", 75),
            ("gerente", 65),
            ("manager", 65),
            ("principal", 55),
            ("jefe", 55),
            ("jefa", 55),
            ("lead", 50),
            ("senior", 45),
            ("sr", 45),
            ("supervisor", 40),
            ("supervisora", 40),
            ("coordinator", 30),
            ("coordinador", 30),
            ("coordinadora", 30),
            ("specialist", 25),
            ("especialista", 25),
            ("analyst", 20),
            ("analista", 20),
            ("junior", 12),
            ("jr", 12),
            ("assistant", 10),
            ("auxiliar", 10),
            ("asistente", 10),
            ("intern", 5),
            ("trainee", 5),
            ("becario", 5),
            ("practicante", 5),
        ]
        .into_iter()
        .map(|(keyword, weight)| SeniorityTerm {
            keyword: keyword.to_string(),
            weight,
        })
        .collect();

        let industries = BTreeMap::from([
            (
                Industry::Tech,
                strings(&[
                    "software", "developer", "desarrollador", "engineer", "ingeniero", "programmer",
                    "programador", "devops", "cloud", "data", "datos", "backend", "frontend",
                    "python", "java", "sistemas",
                ]),
            ),
            (
                Industry::Management,
                strings(&[
                    "manager", "gerente", "management", "director", "administracion", "leadership",
                    "liderazgo", "team", "equipo", "budget", "presupuesto",
                ]),
            ),
            (
                Industry::Operations,
                strings(&[
                    "operations", "operaciones", "logistics", "logistica", "warehouse", "almacen",
                    "production", "produccion", "supply chain", "manufacturing", "manufactura",
                    "maintenance", "mantenimiento", "operator", "operador", "shift", "turno",
                ]),
            ),
            (
                Industry::Strategy,
                strings(&[
                    "strategy", "estrategia", "consulting", "consultoria", "consultant", "consultor",
                    "business development", "transformation", "transformacion", "planning",
                    "planeacion", "growth",
                ]),
            ),
        ]);

        let units = vec![
            UnitProfile {
                id: "executive_search".to_string(),
                keywords: strings(&[
                    "executive", "ejecutivo", "board", "c level", "vice president", "director",
                    "chief", "p l", "leadership", "liderazgo",
                ]),
                hard_skill_weight: 3.0,
                seniority_bonus: levels([(MidManagement, 10.0), (Executive, 40.0)]),
                industry_bonus: BTreeMap::from([(Industry::Management, 10.0), (Industry::Strategy, 5.0)]),
                salary_bonus: [0.0, 0.0, 5.0, 15.0],
                experience_bonus: [0.0, 0.0, 5.0, 10.0],
                location_keywords: Vec::new(),
                location_weight: 0.0,
                level_weights: BTreeMap::from([
                    (Entry, LevelWeights { hard_skill: 0.2, ..LevelWeights::default() }),
                    (Operational, LevelWeights { hard_skill: 0.5, ..LevelWeights::default() }),
                ]),
            },
            UnitProfile {
                id: "strategy_consulting".to_string(),
                keywords: strings(&[
                    "strategy", "estrategia", "consulting", "consultoria", "consultant", "consultor",
                    "transformation", "transformacion", "business case", "market analysis",
                    "planning", "planeacion",
                ]),
                hard_skill_weight: 3.0,
                seniority_bonus: levels([(Operational, 5.0), (MidManagement, 15.0), (Executive, 10.0)]),
                industry_bonus: BTreeMap::from([(Industry::Strategy, 20.0), (Industry::Management, 5.0)]),
                salary_bonus: [0.0, 2.0, 6.0, 8.0],
                experience_bonus: [0.0, 3.0, 6.0, 6.0],
                location_keywords: Vec::new(),
                location_weight: 0.0,
                level_weights: BTreeMap::new(),
            },
            UnitProfile {
                id: "tech_talent".to_string(),
                keywords: strings(&[
                    "software", "developer", "desarrollador", "engineer", "ingeniero", "programador",
                    "python", "java", "javascript", "cloud", "devops", "data", "datos", "backend",
                    "frontend", "full stack", "qa",
                ]),
                hard_skill_weight: 3.0,
                seniority_bonus: levels([
                    (Entry, 5.0),
                    (Operational, 10.0),
                    (MidManagement, 8.0),
                    (Executive, 2.0),
                ]),
                industry_bonus: BTreeMap::from([(Industry::Tech, 20.0)]),
                salary_bonus: [0.0, 3.0, 5.0, 5.0],
                experience_bonus: [2.0, 5.0, 5.0, 3.0],
                location_keywords: Vec::new(),
                location_weight: 0.0,
                level_weights: BTreeMap::from([(
                    Executive,
                    LevelWeights { hard_skill: 0.5, ..LevelWeights::default() },
                )]),
            },
            UnitProfile {
                id: "global_mobility".to_string(),
                keywords: strings(&[
                    "relocation", "reubicacion", "visa", "work permit", "permiso de trabajo",
                    "bilingual", "bilingue", "international", "internacional", "expat",
                    "expatriado",
                ]),
                hard_skill_weight: 3.0,
                seniority_bonus: levels([
                    (Entry, 3.0),
                    (Operational, 3.0),
                    (MidManagement, 3.0),
                    (Executive, 3.0),
                ]),
                industry_bonus: BTreeMap::new(),
                salary_bonus: [0.0; 4],
                experience_bonus: [0.0, 2.0, 2.0, 2.0],
                location_keywords: strings(&[
                    "migration", "migracion", "visa", "relocation", "reubicacion", "abroad",
                    "extranjero", "cross border", "transfronterizo", "sponsorship", "canada",
                    "estados unidos", "espana", "germany", "alemania",
                ]),
                location_weight: 15.0,
                level_weights: BTreeMap::new(),
            },
            UnitProfile {
                id: "operations_staffing".to_string(),
                keywords: strings(&[
                    "operations", "operaciones", "warehouse", "almacen", "logistics", "logistica",
                    "operator", "operador", "production", "produccion", "forklift", "montacargas",
                    "driver", "chofer", "maintenance", "mantenimiento", "shift", "turno",
                ]),
                hard_skill_weight: 3.0,
                seniority_bonus: levels([(Entry, 10.0), (Operational, 15.0), (MidManagement, 5.0)]),
                industry_bonus: BTreeMap::from([(Industry::Operations, 20.0)]),
                salary_bonus: [5.0, 3.0, 0.0, 0.0],
                experience_bonus: [5.0, 3.0, 0.0, 0.0],
                location_keywords: Vec::new(),
                location_weight: 0.0,
                level_weights: BTreeMap::from([(
                    Executive,
                    LevelWeights { hard_skill: 0.5, ..LevelWeights::default() },
                )]),
            },
        ];

        Self {
            seniority,
            industries,
            salary_thresholds: [20_000.0, 60_000.0, 120_000.0],
            experience_thresholds: [2, 5, 10],
            units,
        }
    }
}

#[cfg(test)]
#[path = "business_unit_classifier_test.rs"]
mod tests;
