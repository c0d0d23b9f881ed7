use serde_json::{Value, json};

use survey_spec::{AnswerMap, Survey, SurveyComponent, is_visible, resolve_visibility};

fn fixture(name: &str) -> &'static str {
    match name {
        "legacy_survey" => include_str!("../tests/fixtures/legacy_survey.json"),
        "vitals_survey" => include_str!("../tests/fixtures/vitals_survey.json"),
        _ => panic!("unknown fixture {}", name),
    }
}

fn survey(name: &str) -> Survey {
    Survey::from_json_str(fixture(name)).expect("deserialize")
}

fn answers(value: Value) -> AnswerMap {
    value.as_object().cloned().unwrap_or_default()
}

fn question(code: &str, criteria: Option<&str>) -> SurveyComponent {
    serde_json::from_value(json!({
        "id": format!("component-{code}"),
        "visibilityCriteria": criteria,
        "dataElement": { "id": code, "code": code, "name": code, "type": "FreeText" }
    }))
    .expect("component")
}

fn check(criteria: &str, values: Value) -> bool {
    let target = question("TARGET", Some(criteria));
    let all = vec![question("A", None), question("B", None), question("Q", None), target.clone()];
    is_visible(&target, &answers(values), &all)
}

#[test]
fn missing_criteria_is_always_visible() {
    for criteria in [None, Some("")] {
        let target = question("TARGET", criteria);
        for values in [json!({}), json!({ "A": "1" }), json!({ "TARGET": null })] {
            assert!(is_visible(&target, &answers(values), &[target.clone()]));
        }
    }
}

#[test]
fn and_conjunction_requires_every_rule() {
    let criteria = r#"{"_conjunction": "and", "A": ["1"], "B": ["2"]}"#;
    assert!(check(criteria, json!({ "A": "1", "B": "2" })));
    assert!(!check(criteria, json!({ "A": "1", "B": "3" })));
    assert!(!check(criteria, json!({ "A": "0", "B": "2" })));
    assert!(!check(criteria, json!({})));
}

#[test]
fn default_conjunction_requires_any_rule() {
    let criteria = r#"{"A": ["1"], "B": ["2"]}"#;
    assert!(check(criteria, json!({ "A": "1", "B": "3" })));
    assert!(check(criteria, json!({ "A": "0", "B": "2" })));
    assert!(!check(criteria, json!({ "A": "0", "B": "0" })));

    let explicit_or = r#"{"_conjunction": "or", "A": ["1"], "B": ["2"]}"#;
    assert!(check(explicit_or, json!({ "B": "2" })));
}

#[test]
fn hidden_flag_does_not_affect_evaluation() {
    assert!(check(r#"{"hidden": true}"#, json!({})));
    assert!(check(r#"{"hidden": true, "A": ["1"]}"#, json!({ "A": "1" })));
}

#[test]
fn bounded_range_is_inclusive() {
    let criteria = r#"{"Q": {"type": "range", "start": 10, "end": 20}}"#;
    assert!(check(criteria, json!({ "Q": 15 })));
    assert!(check(criteria, json!({ "Q": 10 })));
    assert!(check(criteria, json!({ "Q": 20 })));
    assert!(!check(criteria, json!({ "Q": 25 })));
    assert!(!check(criteria, json!({})));
}

#[test]
fn zero_answer_never_satisfies_a_range() {
    let criteria = r#"{"Q": {"type": "range", "start": -10, "end": 10}}"#;
    assert!(!check(criteria, json!({ "Q": 0 })));
    assert!(check(criteria, json!({ "Q": -5 })));
}

#[test]
fn open_start_range_is_strictly_below_end() {
    let criteria = r#"{"Q": {"type": "range", "end": 20}}"#;
    assert!(check(criteria, json!({ "Q": 19 })));
    assert!(!check(criteria, json!({ "Q": 20 })));
    assert!(!check(criteria, json!({ "Q": 21 })));
}

#[test]
fn open_end_range_is_at_least_start() {
    let criteria = r#"{"Q": {"type": "range", "start": 10}}"#;
    assert!(check(criteria, json!({ "Q": 10 })));
    assert!(check(criteria, json!({ "Q": 1000 })));
    assert!(!check(criteria, json!({ "Q": 9.5 })));
}

#[test]
fn malformed_json_falls_back_to_legacy_format() {
    let survey = survey("legacy_survey");
    let target = survey.find_by_code("TEST_CHECK").expect("component");

    assert!(is_visible(target, &answers(json!({ "REF": true })), &survey.components));
    assert!(!is_visible(target, &answers(json!({ "REF": false })), &survey.components));
    assert!(!is_visible(target, &AnswerMap::new(), &survey.components));
}

#[test]
fn legacy_reference_to_unknown_code_is_visible() {
    let survey = survey("legacy_survey");
    let target = survey.find_by_code("TEST_ORPHAN").expect("component");
    assert!(is_visible(target, &AnswerMap::new(), &survey.components));
}

#[test]
fn legacy_fallback_hides_derived_questions() {
    let survey = survey("legacy_survey");
    let calculated = survey.find_by_code("TEST_CALC").expect("component");
    assert!(!is_visible(calculated, &answers(json!({ "REF": true })), &survey.components));
}

#[test]
fn end_to_end_legacy_survey() {
    let survey = survey("legacy_survey");
    let map = resolve_visibility(&survey, &json!({ "REF": true }));
    assert_eq!(map.get("component-test-always"), Some(&true));
    assert_eq!(map.get("component-ref"), Some(&true));
    assert_eq!(map.get("component-test-check"), Some(&true));
    assert_eq!(map.get("component-test-calc"), Some(&false));
    assert_eq!(map.get("component-test-orphan"), Some(&true));
}

#[test]
fn vitals_criteria_use_data_element_codes() {
    let survey = survey("vitals_survey");
    let gestation = survey.find_by_code("PatientVitalsGestation").expect("component");
    let fever = survey.find_by_code("PatientVitalsFeverNote").expect("component");

    let pregnant_with_fever = answers(json!({ "pde-pregnant": "Yes", "pde-temperature": "38.4" }));
    assert!(is_visible(gestation, &pregnant_with_fever, &survey.components));
    assert!(is_visible(fever, &pregnant_with_fever, &survey.components));

    let pregnant_no_fever = answers(json!({ "pde-pregnant": "Yes", "pde-temperature": 36.9 }));
    assert!(!is_visible(fever, &pregnant_no_fever, &survey.components));

    let not_pregnant = answers(json!({ "pde-pregnant": "No", "pde-temperature": 39 }));
    assert!(!is_visible(gestation, &not_pregnant, &survey.components));
    assert!(!is_visible(fever, &not_pregnant, &survey.components));
}

#[test]
fn evaluation_is_repeatable() {
    let survey = survey("vitals_survey");
    let values = json!({ "pde-pregnant": "Yes", "pde-temperature": 38 });
    let first = resolve_visibility(&survey, &values);
    let second = resolve_visibility(&survey, &values);
    assert_eq!(first, second);
}
