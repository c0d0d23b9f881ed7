use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind of answer a data element collects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum DataElementType {
    FreeText,
    Multiline,
    Radio,
    Select,
    MultiSelect,
    Autocomplete,
    Date,
    DateTime,
    SubmissionDate,
    Instruction,
    Number,
    Binary,
    Checkbox,
    CalculatedQuestion,
    ConditionQuestion,
    Result,
    SurveyAnswer,
    SurveyResult,
    SurveyLink,
    Photo,
    Geolocate,
    UserData,
    PatientData,
    PatientIssue,
}

impl DataElementType {
    /// Label used in the survey definition JSON.
    pub fn as_str(&self) -> &'static str {
        match self {
            DataElementType::FreeText => "FreeText",
            DataElementType::Multiline => "Multiline",
            DataElementType::Radio => "Radio",
            DataElementType::Select => "Select",
            DataElementType::MultiSelect => "MultiSelect",
            DataElementType::Autocomplete => "Autocomplete",
            DataElementType::Date => "Date",
            DataElementType::DateTime => "DateTime",
            DataElementType::SubmissionDate => "SubmissionDate",
            DataElementType::Instruction => "Instruction",
            DataElementType::Number => "Number",
            DataElementType::Binary => "Binary",
            DataElementType::Checkbox => "Checkbox",
            DataElementType::CalculatedQuestion => "CalculatedQuestion",
            DataElementType::ConditionQuestion => "ConditionQuestion",
            DataElementType::Result => "Result",
            DataElementType::SurveyAnswer => "SurveyAnswer",
            DataElementType::SurveyResult => "SurveyResult",
            DataElementType::SurveyLink => "SurveyLink",
            DataElementType::Photo => "Photo",
            DataElementType::Geolocate => "Geolocate",
            DataElementType::UserData => "UserData",
            DataElementType::PatientData => "PatientData",
            DataElementType::PatientIssue => "PatientIssue",
        }
    }

    /// Types that only present derived data and never take direct input.
    pub fn is_derived(&self) -> bool {
        matches!(
            self,
            DataElementType::Result | DataElementType::CalculatedQuestion
        )
    }

    /// Types whose visible answers trigger a follow-up action on submission.
    pub fn is_action(&self) -> bool {
        matches!(self, DataElementType::PatientIssue)
    }

    /// Types that cannot hold an answer.
    pub fn is_answerable(&self) -> bool {
        !matches!(self, DataElementType::Instruction | DataElementType::Result)
    }

    pub fn is_date(&self) -> bool {
        matches!(
            self,
            DataElementType::Date | DataElementType::DateTime | DataElementType::SubmissionDate
        )
    }
}

/// The question definition a component points at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DataElement {
    pub id: String,
    pub code: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub kind: DataElementType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_options: Option<Value>,
}

/// One question placed on a survey screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SurveyComponent {
    pub id: String,
    pub data_element: DataElement,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility_criteria: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_criteria: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calculation: Option<String>,
    #[serde(default)]
    pub screen_index: u32,
    #[serde(default)]
    pub component_index: u32,
}

impl SurveyComponent {
    pub fn code(&self) -> &str {
        &self.data_element.code
    }

    pub fn kind(&self) -> DataElementType {
        self.data_element.kind
    }

    /// Label shown for the question, falling back to the data element text.
    pub fn label(&self) -> &str {
        self.text
            .as_deref()
            .filter(|text| !text.is_empty())
            .or(self.data_element.default_text.as_deref())
            .unwrap_or(&self.data_element.name)
    }

    /// Non-empty visibility criteria, if any.
    pub fn criteria(&self) -> Option<&str> {
        self.visibility_criteria
            .as_deref()
            .filter(|criteria| !criteria.is_empty())
    }

    /// Non-empty formula, if any.
    pub fn formula(&self) -> Option<&str> {
        self.calculation
            .as_deref()
            .filter(|formula| !formula.is_empty())
    }
}
