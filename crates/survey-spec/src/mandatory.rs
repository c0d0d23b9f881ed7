use serde_json::Value;
use tracing::warn;

use crate::answers::AnswerMap;
use crate::coerce::is_truthy;
use crate::criteria::VisibilityCriteria;

/// Whether a question must be answered.
///
/// `mandatory` is the `validationCriteria.mandatory` entry: a boolean, or a
/// criteria object evaluated like visibility criteria against `values` as
/// given. A criteria object that cannot be evaluated makes the question
/// optional.
pub fn check_mandatory(mandatory: Option<&Value>, values: &AnswerMap) -> bool {
    let Some(mandatory) = mandatory.filter(|mandatory| is_truthy(Some(mandatory))) else {
        return false;
    };
    if let Value::Bool(flag) = mandatory {
        return *flag;
    }

    let Some(criteria) = VisibilityCriteria::from_value(mandatory) else {
        return true;
    };
    criteria.evaluate(values).unwrap_or_else(|error| {
        warn!(%mandatory, %error, "failed to use mandatory in validationCriteria");
        false
    })
}
