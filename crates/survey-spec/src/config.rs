//! Lenient decoding of a component's JSON `config` and `validationCriteria`.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::spec::component::SurveyComponent;

pub type ConfigObject = Map<String, Value>;

/// Decodes a JSON object string. Empty input is an empty object; invalid JSON
/// or a non-object is logged and treated as empty.
pub fn parse_config_object(component_id: &str, config: Option<&str>) -> ConfigObject {
    let Some(raw) = config.filter(|raw| !raw.is_empty()) else {
        return ConfigObject::new();
    };
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(object)) => object,
        Ok(_) => ConfigObject::new(),
        Err(error) => {
            warn!(component = %component_id, %error, "invalid config in survey screen component");
            ConfigObject::new()
        }
    }
}

/// One normal range, optionally restricted to an age band.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NormalRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age_unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age_min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age_max: Option<f64>,
}

/// Either a single range or a list of age-banded ranges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum NormalRangeSpec {
    ByAge(Vec<NormalRange>),
    Single(NormalRange),
}

/// Decoded `validationCriteria` of a component.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ValidationCriteria {
    pub min: Option<f64>,
    pub max: Option<f64>,
    /// `true`/`false` or a criteria object, see [`crate::mandatory`].
    pub mandatory: Option<Value>,
    pub normal_range: Option<NormalRangeSpec>,
}

impl ValidationCriteria {
    /// Reads the known keys; a bound that is not a number is ignored.
    pub fn from_object(object: &ConfigObject) -> Self {
        Self {
            min: object.get("min").and_then(Value::as_f64),
            max: object.get("max").and_then(Value::as_f64),
            mandatory: object.get("mandatory").cloned(),
            normal_range: object
                .get("normalRange")
                .and_then(|range| serde_json::from_value(range.clone()).ok()),
        }
    }

    pub fn for_component(component: &SurveyComponent) -> Self {
        Self::from_object(&parse_config_object(
            &component.id,
            component.validation_criteria.as_deref(),
        ))
    }
}

/// Display unit from a component's `config`, e.g. `"kg"`.
pub fn unit_for_component(component: &SurveyComponent) -> String {
    parse_config_object(&component.id, component.config.as_deref())
        .get("unit")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn invalid_config_is_empty() {
        assert!(parse_config_object("c1", Some("{not json")).is_empty());
        assert!(parse_config_object("c1", Some("[1, 2]")).is_empty());
        assert!(parse_config_object("c1", Some("")).is_empty());
        assert!(parse_config_object("c1", None).is_empty());
    }

    #[test]
    fn reads_validation_criteria() {
        let object = parse_config_object(
            "c1",
            Some(r#"{"min": 30, "max": "high", "mandatory": true, "normalRange": {"min": 35, "max": 37.5}}"#),
        );
        let criteria = ValidationCriteria::from_object(&object);
        assert_eq!(criteria.min, Some(30.0));
        assert_eq!(criteria.max, None);
        assert_eq!(criteria.mandatory, Some(json!(true)));
        assert_eq!(
            criteria.normal_range,
            Some(NormalRangeSpec::Single(NormalRange {
                min: Some(35.0),
                max: Some(37.5),
                ..NormalRange::default()
            }))
        );
    }

    #[test]
    fn reads_age_banded_ranges() {
        let object = parse_config_object(
            "c1",
            Some(r#"{"normalRange": [{"min": 1, "max": 2, "ageUnit": "years", "ageMin": 0, "ageMax": 5}]}"#),
        );
        let criteria = ValidationCriteria::from_object(&object);
        assert!(matches!(criteria.normal_range, Some(NormalRangeSpec::ByAge(ref ranges)) if ranges.len() == 1));
    }
}
