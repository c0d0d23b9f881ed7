use serde_json::Value;
use tracing::warn;

use crate::answers::{AnswerMap, values_by_code};
use crate::criteria::VisibilityCriteria;
use crate::legacy::fallback_visibility;
use crate::spec::component::SurveyComponent;
use crate::spec::survey::Survey;

/// Component id to visibility.
pub type VisibilityMap = std::collections::BTreeMap<String, bool>;

/// Decides whether `component` is shown for the current answers.
///
/// `values` is keyed by data element id. Criteria reference questions by
/// data element code, so answers are re-keyed through `all_components`
/// before the rules run. Criteria that are not JSON, or whose evaluation
/// reaches an unsupported rule, fall back to the legacy `CODE: value`
/// format; this never fails.
pub fn is_visible(
    component: &SurveyComponent,
    values: &AnswerMap,
    all_components: &[SurveyComponent],
) -> bool {
    let Some(raw) = component.criteria() else {
        return true;
    };

    let criteria = match VisibilityCriteria::parse(raw) {
        Ok(None) => return true,
        Ok(Some(criteria)) if criteria.is_empty() => return true,
        Ok(Some(criteria)) => criteria,
        Err(error) => {
            warn!(
                component = %component.id,
                criteria = %raw,
                %error,
                "visibility criteria is not valid JSON, using legacy fallback"
            );
            return fallback_visibility(component, values, all_components);
        }
    };

    match criteria.evaluate(&values_by_code(values, all_components)) {
        Ok(visible) => visible,
        Err(error) => {
            warn!(
                component = %component.id,
                criteria = %raw,
                %error,
                "visibility criteria could not be evaluated, using legacy fallback"
            );
            fallback_visibility(component, values, all_components)
        }
    }
}

/// Visibility of every component in the survey.
pub fn resolve_visibility(survey: &Survey, answers: &Value) -> VisibilityMap {
    let values = answers.as_object().cloned().unwrap_or_default();
    survey
        .components
        .iter()
        .map(|component| {
            (
                component.id.clone(),
                is_visible(component, &values, &survey.components),
            )
        })
        .collect()
}
