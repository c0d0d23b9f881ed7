use std::collections::HashSet;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::spec::component::SurveyComponent;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("survey definition is not valid: {0}")]
    Json(#[from] serde_json::Error),
    #[error("data element code '{0}' is used by more than one component")]
    DuplicateCode(String),
    #[error("component id '{0}' is used more than once")]
    DuplicateComponentId(String),
}

/// Top-level survey definition: an ordered list of components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Survey {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub components: Vec<SurveyComponent>,
}

impl Survey {
    /// Parses a survey definition and checks that component ids and data
    /// element codes are unique.
    pub fn from_json_str(json: &str) -> Result<Self, LoadError> {
        let survey: Survey = serde_json::from_str(json)?;
        survey.check_unique_keys()?;
        Ok(survey)
    }

    pub fn check_unique_keys(&self) -> Result<(), LoadError> {
        let mut codes = HashSet::new();
        let mut ids = HashSet::new();
        for component in &self.components {
            if !ids.insert(component.id.as_str()) {
                return Err(LoadError::DuplicateComponentId(component.id.clone()));
            }
            if !codes.insert(component.data_element.code.as_str()) {
                return Err(LoadError::DuplicateCode(component.data_element.code.clone()));
            }
        }
        Ok(())
    }

    pub fn find_by_code(&self, code: &str) -> Option<&SurveyComponent> {
        find_by_code(&self.components, code)
    }

    pub fn find_by_data_element_id(&self, id: &str) -> Option<&SurveyComponent> {
        find_by_data_element_id(&self.components, id)
    }

    /// Distinct screen indices in ascending order.
    pub fn screens(&self) -> Vec<u32> {
        let mut screens: Vec<u32> = self
            .components
            .iter()
            .map(|component| component.screen_index)
            .collect();
        screens.sort_unstable();
        screens.dedup();
        screens
    }
}

pub fn find_by_code<'a>(
    components: &'a [SurveyComponent],
    code: &str,
) -> Option<&'a SurveyComponent> {
    components
        .iter()
        .find(|component| component.data_element.code == code)
}

pub fn find_by_data_element_id<'a>(
    components: &'a [SurveyComponent],
    id: &str,
) -> Option<&'a SurveyComponent> {
    components
        .iter()
        .find(|component| component.data_element.id == id)
}
