//! Pre-JSON visibility criteria of the form `"CODE: value"`.
//!
//! Reached when a criteria string is not JSON, or when its evaluation hits a
//! rule it cannot decode.

use serde_json::Value;

use crate::answers::AnswerMap;
use crate::coerce::to_js_string;
use crate::spec::component::SurveyComponent;
use crate::spec::survey::find_by_code;

/// Splits `"CODE: value"` into its trimmed code and required value. Text after
/// a second colon is ignored; the value is `None` when there is no colon.
pub fn split_criteria(criteria: &str) -> (&str, Option<&str>) {
    let mut parts = criteria.split(':').map(str::trim);
    let code = parts.next().unwrap_or_default();
    (code, parts.next())
}

/// Evaluates a legacy criteria string against answers keyed by data element id.
///
/// Result and calculated questions are never shown this way. A criteria that
/// names an unknown code leaves the question visible.
pub fn fallback_visibility(
    component: &SurveyComponent,
    values: &AnswerMap,
    all_components: &[SurveyComponent],
) -> bool {
    if component.kind().is_derived() {
        return false;
    }
    let Some(criteria) = component.criteria() else {
        return true;
    };

    let (code, required_value) = split_criteria(criteria);
    let Some(referenced) = find_by_code(all_components, code) else {
        return true;
    };

    let form_value = values.get(&referenced.data_element.id);
    let sanitised = required_value.unwrap_or_default().trim().to_lowercase();

    if let Some(Value::Bool(answer)) = form_value {
        if *answer && sanitised == "yes" {
            return true;
        }
        if !*answer && sanitised == "no" {
            return true;
        }
    }

    let answer = match form_value {
        None | Some(Value::Null) => String::new(),
        Some(value) => to_js_string(value),
    };
    sanitised == answer.to_lowercase().trim()
}
