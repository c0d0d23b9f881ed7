use serde_json::{Map, Value};

use crate::spec::component::{DataElementType, SurveyComponent};
use crate::spec::survey::{Survey, find_by_data_element_id};
use crate::visibility::is_visible;

/// Current answers, keyed by question identifier. A missing key is an
/// unanswered question; `Value::Null` is an explicitly cleared one.
pub type AnswerMap = Map<String, Value>;

/// Re-keys answers from data element id to data element code.
///
/// Answers whose key matches no component are dropped.
pub fn values_by_code(values: &AnswerMap, components: &[SurveyComponent]) -> AnswerMap {
    values
        .iter()
        .filter_map(|(key, value)| {
            find_by_data_element_id(components, key)
                .map(|component| (component.data_element.code.clone(), value.clone()))
        })
        .collect()
}

/// Submitted values minus those belonging to action-only questions.
pub fn answers_from_data(data: &AnswerMap, survey: &Survey) -> AnswerMap {
    data.iter()
        .filter(|(key, _)| {
            survey
                .find_by_data_element_id(key)
                .is_none_or(|component| !component.kind().is_action())
        })
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// Data element ids of visible action questions present in the submission.
pub fn actions_from_data(data: &AnswerMap, survey: &Survey) -> Vec<String> {
    data.keys()
        .filter(|key| {
            survey.find_by_data_element_id(key).is_some_and(|component| {
                component.kind().is_action() && is_visible(component, data, &survey.components)
            })
        })
        .cloned()
        .collect()
}

/// Type-driven starting answers for a blank survey, keyed by data element id.
pub fn form_initial_values(components: &[SurveyComponent]) -> AnswerMap {
    components
        .iter()
        .filter_map(|component| {
            initial_value(component.kind())
                .map(|value| (component.data_element.id.clone(), value))
        })
        .collect()
}

fn initial_value(kind: DataElementType) -> Option<Value> {
    match kind {
        DataElementType::FreeText
        | DataElementType::Multiline
        | DataElementType::Number
        | DataElementType::PatientIssue => Some(Value::String(String::new())),
        _ => None,
    }
}

/// Whether an answer counts toward progress.
pub fn is_answered(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(text)) => !text.trim().is_empty(),
        Some(_) => true,
    }
}
