//! JSON visibility criteria.
//!
//! A criteria string decodes to an object whose `_conjunction` and `hidden`
//! keys are reserved; every other key names a question and maps to the rule
//! its answer must satisfy:
//!
//! ```json
//! { "_conjunction": "and", "SMOKER": ["Yes"], "AGE": { "type": "range", "start": 18 } }
//! ```
//!
//! Rules are decoded as evaluation reaches them, in the order they were
//! written. A rule that is never reached is never checked.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::answers::AnswerMap;
use crate::coerce::{is_truthy, parse_float, same_value, to_js_string, to_number};

const CONJUNCTION_KEY: &str = "_conjunction";
const HIDDEN_KEY: &str = "hidden";

#[derive(Debug, Error)]
pub enum CriteriaError {
    #[error("criteria is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported rule for question '{question}': {rule}")]
    UnsupportedRule { question: String, rule: Value },
}

/// How the per-question rules combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Conjunction {
    And,
    /// Any other `_conjunction` value, including none, means "any rule".
    #[default]
    Or,
}

impl Conjunction {
    fn from_value(value: Option<&Value>) -> Self {
        match value.and_then(Value::as_str) {
            Some("and") => Conjunction::And,
            _ => Conjunction::Or,
        }
    }
}

/// Condition on a single question's answer.
#[derive(Debug, Clone, PartialEq)]
pub enum AnswerRule {
    /// Answer must equal one of the listed values.
    OneOf(Vec<Value>),
    /// Answer, as a string, must occur inside the given text.
    Substring(String),
    /// Numeric bounds; a falsy bound counts as absent.
    Range {
        start: Option<Value>,
        end: Option<Value>,
    },
}

impl AnswerRule {
    pub fn decode(question: &str, rule: &Value) -> Result<Self, CriteriaError> {
        match rule {
            Value::Array(items) => Ok(AnswerRule::OneOf(items.clone())),
            Value::String(text) => Ok(AnswerRule::Substring(text.clone())),
            Value::Object(fields) if fields.get("type").and_then(Value::as_str) == Some("range") => {
                Ok(AnswerRule::Range {
                    start: fields.get("start").cloned(),
                    end: fields.get("end").cloned(),
                })
            }
            other => Err(CriteriaError::UnsupportedRule {
                question: question.to_string(),
                rule: other.clone(),
            }),
        }
    }

    /// Whether `value` satisfies the rule. A missing answer is `None`.
    pub fn matches(&self, value: Option<&Value>) -> bool {
        match self {
            AnswerRule::OneOf(accepted) => accepted
                .iter()
                .any(|candidate| same_value(candidate, value)),
            AnswerRule::Substring(text) => {
                let needle = value.map(to_js_string).unwrap_or_else(|| "undefined".into());
                text.contains(&needle)
            }
            AnswerRule::Range { start, end } => {
                in_range(value, start.as_ref(), end.as_ref())
            }
        }
    }
}

// A falsy answer (including 0) never satisfies a range.
fn in_range(value: Option<&Value>, start: Option<&Value>, end: Option<&Value>) -> bool {
    if !is_truthy(value) {
        return false;
    }
    let number = to_number(value);
    if !is_truthy(start) {
        return number < to_number(end);
    }
    if !is_truthy(end) {
        return number >= to_number(start);
    }
    let (start, end) = (parse_float(start), parse_float(end));
    number >= start && number <= end
}

/// Criteria object with its reserved keys split out.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VisibilityCriteria {
    pub conjunction: Conjunction,
    /// Reserved flag carried through from the definition; not evaluated.
    pub hidden: Option<Value>,
    /// Question key and raw rule, in definition order.
    pub rules: Vec<(String, Value)>,
}

impl VisibilityCriteria {
    /// Decodes a criteria string. `Ok(None)` means the JSON held no criteria
    /// object at all (`null`, a number, ...), which always passes.
    pub fn parse(raw: &str) -> Result<Option<Self>, CriteriaError> {
        let value: Value = serde_json::from_str(raw)?;
        Ok(Self::from_value(&value))
    }

    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self::from_object(fields)),
            _ => None,
        }
    }

    fn from_object(fields: &Map<String, Value>) -> Self {
        Self {
            conjunction: Conjunction::from_value(fields.get(CONJUNCTION_KEY)),
            hidden: fields.get(HIDDEN_KEY).cloned(),
            rules: fields
                .iter()
                .filter(|(question, _)| *question != CONJUNCTION_KEY && *question != HIDDEN_KEY)
                .map(|(question, rule)| (question.clone(), rule.clone()))
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Evaluates the rules against answers keyed the same way as the rules.
    ///
    /// `and` stops at the first unmet rule, anything else at the first met
    /// one. An unsupported rule is an error only if evaluation reaches it.
    pub fn evaluate(&self, values: &AnswerMap) -> Result<bool, CriteriaError> {
        if self.rules.is_empty() {
            return Ok(true);
        }
        let stop_on = match self.conjunction {
            Conjunction::And => false,
            Conjunction::Or => true,
        };
        for (question, rule) in &self.rules {
            let met = AnswerRule::decode(question, rule)?.matches(values.get(question));
            if met == stop_on {
                return Ok(stop_on);
            }
        }
        Ok(!stop_on)
    }
}

/// Decodes and evaluates a criteria string in one step.
pub fn check_json_criteria(raw: &str, values: &AnswerMap) -> Result<bool, CriteriaError> {
    match VisibilityCriteria::parse(raw)? {
        Some(criteria) => criteria.evaluate(values),
        None => Ok(true),
    }
}
