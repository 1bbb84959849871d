// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::*;
use std::io::Write;

fn classifier() -> BusinessUnitClassifier {
    BusinessUnitClassifier::from_config(&BusinessUnitConfig::default()).unwrap()
}

fn twin_profiles(first: &str, second: &str) -> ClassifierProfiles {
    let unit = |id: &str| UnitProfile {
        id: id.to_string(),
        keywords: vec!["welder".to_string()],
        hard_skill_weight: 2.0,
        seniority_bonus: BTreeMap::new(),
        industry_bonus: BTreeMap::new(),
        salary_bonus: [0.0; 4],
        experience_bonus: [0.0; 4],
        location_keywords: Vec::new(),
        location_weight: 0.0,
        level_weights: BTreeMap::new(),
    };
    ClassifierProfiles {
        units: vec![unit(first), unit(second)],
        ..ClassifierProfiles::default()
    }
}

#[test]
fn test_assign_is_deterministic() {
    let classifier = classifier();
    let assign = || {
        classifier.assign(
            "Senior Software Engineer",
            Some("Support for migration, visa paperwork and a bilingual team"),
            None,
            Some(5),
            Some("Ciudad de México"),
        )
    };

    let first = assign();
    for _ in 0..10 {
        assert_eq!(assign(), first);
    }
    assert!(!first.ambiguous);
    assert!(classifier
        .profiles()
        .units
        .iter()
        .any(|unit| unit.id == first.unit));
}

#[test]
fn test_equal_scores_follow_priority_order() {
    let classifier = BusinessUnitClassifier::new(twin_profiles("alpha", "beta"), "alpha").unwrap();
    let assignment = classifier.assign("Welder", None, None, None, None);
    assert_eq!(assignment.scores[0].1, assignment.scores[1].1);
    assert_eq!(assignment.unit, "alpha");

    let reversed = BusinessUnitClassifier::new(twin_profiles("beta", "alpha"), "alpha").unwrap();
    assert_eq!(reversed.assign("Welder", None, None, None, None).unit, "beta");
}

#[test]
fn test_zero_scores_fall_back_to_default() {
    let assignment = classifier().assign("Recepcionista", None, None, None, None);
    assert_eq!(assignment.unit, "operations_staffing");
    assert!(assignment.ambiguous);
    assert!(assignment.scores.iter().all(|(_, score)| *score == 0.0));
}

#[test]
fn test_executive_titles_go_to_executive_search() {
    let assignment = classifier().assign(
        "Chief Financial Officer",
        Some("Report to the board and own the P&L."),
        Some(&SalaryRange::new(150_000.0, 200_000.0)),
        Some(15),
        Some("Monterrey"),
    );
    assert_eq!(assignment.level, PositionLevel::Executive);
    assert_eq!(assignment.unit, "executive_search");
}

#[test]
fn test_operational_roles_go_to_operations_staffing() {
    let assignment = classifier().assign(
        "Operador de Montacargas",
        Some("Turno nocturno en almacén"),
        Some(&SalaryRange::new(9_000.0, 11_000.0)),
        Some(1),
        Some("Querétaro"),
    );
    assert_eq!(assignment.seniority, 0);
    assert_eq!(assignment.level, PositionLevel::Operational);
    assert_eq!(assignment.industry, Some(Industry::Operations));
    assert_eq!(assignment.unit, "operations_staffing");
}

#[test]
fn test_migration_terms_favor_global_mobility() {
    let assignment = classifier().assign(
        "Relocation Coordinator",
        Some("Handle visa sponsorship and relocation for engineers moving abroad"),
        None,
        None,
        Some("Toronto, Canada"),
    );
    assert_eq!(assignment.unit, "global_mobility");
}

#[test]
fn test_seniority_takes_highest_tier_in_title() {
    let classifier = classifier();
    assert_eq!(classifier.seniority_score("Senior Operations Manager"), 65);
    assert_eq!(classifier.seniority_score("Vice President, Sales"), 95);
    assert_eq!(classifier.seniority_score("Becario de Finanzas"), 5);
    assert_eq!(classifier.seniority_score("Welder"), 0);
}

#[test]
fn test_position_levels() {
    assert_eq!(PositionLevel::from_seniority(0), PositionLevel::Operational);
    assert_eq!(PositionLevel::from_seniority(5), PositionLevel::Entry);
    assert_eq!(PositionLevel::from_seniority(45), PositionLevel::Operational);
    assert_eq!(PositionLevel::from_seniority(65), PositionLevel::MidManagement);
    assert_eq!(PositionLevel::from_seniority(100), PositionLevel::Executive);
}

#[test]
fn test_industry_ties_have_no_dominant_category() {
    let classifier = classifier();
    assert_eq!(classifier.dominant_industry("Software operations", None), None);
    assert_eq!(
        classifier.dominant_industry("Software developer", Some("operations support")),
        Some(Industry::Tech)
    );
    assert_eq!(classifier.dominant_industry("Recepcionista", None), None);
}

#[test]
fn test_profiles_load_from_yaml() {
    let yaml = serde_yaml::to_string(&twin_profiles("welding", "assembly")).unwrap();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(yaml.as_bytes()).unwrap();

    let classifier = BusinessUnitClassifier::from_config(&BusinessUnitConfig {
        default_unit: "assembly".to_string(),
        profiles_path: Some(file.path().to_path_buf()),
    })
    .unwrap();

    assert_eq!(classifier.assign("Welder", None, None, None, None).unit, "welding");
    assert_eq!(classifier.assign("Cashier", None, None, None, None).unit, "assembly");
}

#[test]
fn test_unknown_default_unit_is_rejected() {
    let err = BusinessUnitClassifier::new(ClassifierProfiles::default(), "marketing").unwrap_err();
    assert!(matches!(err, ClassifierError::UnknownDefault(unit) if unit == "marketing"));
}
