use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Serialize;
use serde_json::Value;

use crate::answers::{AnswerMap, is_answered, values_by_code};
use crate::coerce::{format_number, to_number};
use crate::config::{ValidationCriteria, unit_for_component};
use crate::mandatory::check_mandatory;
use crate::spec::component::{DataElementType, SurveyComponent};
use crate::spec::survey::Survey;
use crate::visibility::is_visible;

/// One problem with a submitted answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationError {
    /// Data element id the answer was submitted under.
    pub question_id: Option<String>,
    pub path: Option<String>,
    pub message: String,
    pub code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<ValidationError>,
    pub missing_required: Vec<String>,
    pub unknown_fields: Vec<String>,
}

/// Checks a submission keyed by data element id.
///
/// Hidden questions are skipped entirely; mandatory criteria see the
/// answers keyed by data element code.
pub fn validate(survey: &Survey, answers: &Value) -> ValidationResult {
    let values: AnswerMap = answers.as_object().cloned().unwrap_or_default();
    let by_code = values_by_code(&values, &survey.components);

    let mut errors = Vec::new();
    let mut missing_required = Vec::new();

    for component in &survey.components {
        if !component.kind().is_answerable() || !is_visible(component, &values, &survey.components) {
            continue;
        }
        let question_id = &component.data_element.id;
        let criteria = ValidationCriteria::for_component(component);
        let value = values.get(question_id);

        if !is_answered(value) {
            if check_mandatory(criteria.mandatory.as_ref(), &by_code) {
                missing_required.push(question_id.clone());
            }
            continue;
        }
        if let Some(value) = value
            && let Some(error) = validate_value(component, &criteria, value)
        {
            errors.push(error);
        }
    }

    let unknown_fields: Vec<String> = values
        .keys()
        .filter(|key| survey.find_by_data_element_id(key).is_none())
        .cloned()
        .collect();

    ValidationResult {
        valid: errors.is_empty() && missing_required.is_empty() && unknown_fields.is_empty(),
        errors,
        missing_required,
        unknown_fields,
    }
}

fn validate_value(
    component: &SurveyComponent,
    criteria: &ValidationCriteria,
    value: &Value,
) -> Option<ValidationError> {
    match component.kind() {
        DataElementType::Number => validate_number(component, criteria, value),
        kind if kind.is_date() => {
            if is_date_value(value) {
                None
            } else {
                Some(base_error(component, "value is not a valid date", "invalid_date"))
            }
        }
        _ => None,
    }
}

fn validate_number(
    component: &SurveyComponent,
    criteria: &ValidationCriteria,
    value: &Value,
) -> Option<ValidationError> {
    let number = to_number(Some(value));
    if number.is_nan() || matches!(value, Value::Bool(_) | Value::Array(_) | Value::Object(_)) {
        return Some(base_error(component, "type mismatch", "type_mismatch"));
    }

    let unit = unit_for_component(component);
    let label = component.label();
    if let Some(min) = criteria.min
        && number < min
    {
        return Some(base_error(
            component,
            &format!("{label} must be at least {}{unit}", format_number(min)),
            "min",
        ));
    }
    if let Some(max) = criteria.max
        && number > max
    {
        return Some(base_error(
            component,
            &format!("{label} can not exceed {}{unit}", format_number(max)),
            "max",
        ));
    }
    None
}

fn is_date_value(value: &Value) -> bool {
    let Some(text) = value.as_str() else {
        return false;
    };
    let text = text.trim();
    NaiveDate::parse_from_str(text, "%Y-%m-%d").is_ok()
        || NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S").is_ok()
        || NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S").is_ok()
        || DateTime::parse_from_rfc3339(text).is_ok()
}

fn base_error(component: &SurveyComponent, message: &str, code: &str) -> ValidationError {
    let question_id = &component.data_element.id;
    ValidationError {
        question_id: Some(question_id.clone()),
        path: Some(format!("/{}", question_id)),
        message: message.into(),
        code: Some(code.into()),
    }
}
