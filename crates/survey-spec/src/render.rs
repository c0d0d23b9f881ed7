use serde_json::{Map, Value, json};

use crate::answers::{AnswerMap, is_answered, values_by_code};
use crate::calculation::{CalculatedValues, run_calculations};
use crate::config::ValidationCriteria;
use crate::mandatory::check_mandatory;
use crate::spec::component::DataElementType;
use crate::spec::survey::Survey;
use crate::visibility::is_visible;

/// Status labels returned by the renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStatus {
    /// A visible mandatory question is unanswered.
    NeedInput,
    /// Every visible mandatory question is answered.
    Complete,
}

impl RenderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderStatus::NeedInput => "need_input",
            RenderStatus::Complete => "complete",
        }
    }
}

/// Progress counters over visible input questions.
#[derive(Debug, Clone)]
pub struct RenderProgress {
    pub answered: usize,
    pub total: usize,
}

/// A single component after evaluation.
#[derive(Debug, Clone)]
pub struct RenderQuestion {
    pub id: String,
    pub data_element_id: String,
    pub code: String,
    pub label: String,
    pub kind: DataElementType,
    pub visible: bool,
    pub mandatory: bool,
    pub current_value: Option<Value>,
}

/// Components sharing a `screenIndex`, in component order.
#[derive(Debug, Clone)]
pub struct RenderScreen {
    pub index: u32,
    pub questions: Vec<RenderQuestion>,
}

/// Result of one evaluation pass over a survey.
#[derive(Debug, Clone)]
pub struct RenderPayload {
    pub survey_id: String,
    pub survey_name: String,
    pub status: RenderStatus,
    pub next_question_id: Option<String>,
    pub progress: RenderProgress,
    pub screens: Vec<RenderScreen>,
    pub calculated: CalculatedValues,
}

impl RenderPayload {
    pub fn questions(&self) -> impl Iterator<Item = &RenderQuestion> {
        self.screens.iter().flat_map(|screen| screen.questions.iter())
    }
}

/// Evaluates visibility, calculations and progress for the given answers,
/// which are keyed by data element id.
pub fn build_render_payload(survey: &Survey, answers: &Value) -> RenderPayload {
    let values: AnswerMap = answers.as_object().cloned().unwrap_or_default();
    let by_code = values_by_code(&values, &survey.components);
    let calculated = run_calculations(&survey.components, &by_code);

    let mut components: Vec<_> = survey.components.iter().collect();
    components.sort_by_key(|component| (component.screen_index, component.component_index));

    let mut screens: Vec<RenderScreen> = Vec::new();
    let mut progress = RenderProgress {
        answered: 0,
        total: 0,
    };
    let mut next_question_id = None;

    for component in components {
        let visible = is_visible(component, &values, &survey.components);
        let kind = component.kind();
        let takes_input = kind.is_answerable() && !kind.is_derived();
        let mandatory = takes_input
            && check_mandatory(
                ValidationCriteria::for_component(component).mandatory.as_ref(),
                &by_code,
            );

        let current_value = match calculated.get(component.code()) {
            Some(result) => result.clone().map(Value::String),
            None => values.get(&component.data_element.id).cloned(),
        };

        if visible && takes_input {
            progress.total += 1;
            if is_answered(current_value.as_ref()) {
                progress.answered += 1;
            } else if mandatory && next_question_id.is_none() {
                next_question_id = Some(component.id.clone());
            }
        }

        let question = RenderQuestion {
            id: component.id.clone(),
            data_element_id: component.data_element.id.clone(),
            code: component.code().to_string(),
            label: component.label().to_string(),
            kind,
            visible,
            mandatory,
            current_value,
        };
        match screens.last_mut() {
            Some(screen) if screen.index == component.screen_index => screen.questions.push(question),
            _ => screens.push(RenderScreen {
                index: component.screen_index,
                questions: vec![question],
            }),
        }
    }

    let status = if next_question_id.is_some() {
        RenderStatus::NeedInput
    } else {
        RenderStatus::Complete
    };

    RenderPayload {
        survey_id: survey.id.clone(),
        survey_name: survey.name.clone(),
        status,
        next_question_id,
        progress,
        screens,
        calculated,
    }
}

/// Render the payload as a structured JSON-friendly value.
pub fn render_json_ui(payload: &RenderPayload) -> Value {
    let screens = payload
        .screens
        .iter()
        .map(|screen| {
            let questions = screen
                .questions
                .iter()
                .map(|question| {
                    let mut map = Map::new();
                    map.insert("id".into(), Value::String(question.id.clone()));
                    map.insert(
                        "data_element_id".into(),
                        Value::String(question.data_element_id.clone()),
                    );
                    map.insert("code".into(), Value::String(question.code.clone()));
                    map.insert("label".into(), Value::String(question.label.clone()));
                    map.insert("type".into(), Value::String(question.kind.as_str().into()));
                    map.insert("visible".into(), Value::Bool(question.visible));
                    map.insert("mandatory".into(), Value::Bool(question.mandatory));
                    if let Some(current_value) = &question.current_value {
                        map.insert("current_value".into(), current_value.clone());
                    }
                    Value::Object(map)
                })
                .collect::<Vec<_>>();
            json!({ "index": screen.index, "questions": questions })
        })
        .collect::<Vec<_>>();

    json!({
        "survey_id": payload.survey_id,
        "survey_name": payload.survey_name,
        "status": payload.status.as_str(),
        "next_question_id": payload.next_question_id,
        "progress": {
            "answered": payload.progress.answered,
            "total": payload.progress.total,
        },
        "screens": screens,
        "calculated": payload.calculated,
    })
}

/// Render the payload as human-friendly text.
pub fn render_text(payload: &RenderPayload) -> String {
    let mut lines = Vec::new();
    lines.push(format!("Survey: {} ({})", payload.survey_name, payload.survey_id));
    lines.push(format!(
        "Status: {} ({}/{})",
        payload.status.as_str(),
        payload.progress.answered,
        payload.progress.total
    ));

    match &payload.next_question_id {
        Some(next_question) => {
            if let Some(question) = payload.questions().find(|question| &question.id == next_question) {
                lines.push(format!("Next question: {} ({})", question.code, question.label));
            }
        }
        None => lines.push("All mandatory questions are answered.".to_string()),
    }

    for screen in &payload.screens {
        let visible: Vec<_> = screen.questions.iter().filter(|question| question.visible).collect();
        if visible.is_empty() {
            continue;
        }
        lines.push(format!("Screen {}:", screen.index + 1));
        for question in visible {
            let mut entry = format!(" - {} ({})", question.code, question.label);
            if question.mandatory {
                entry.push_str(" [mandatory]");
            }
            if let Some(current_value) = &question.current_value {
                entry.push_str(&format!(" = {}", value_to_display(current_value)));
            }
            lines.push(entry);
        }
    }

    lines.join("\n")
}

fn value_to_display(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Bool(true) => "Yes".into(),
        Value::Bool(false) => "No".into(),
        Value::Number(num) => num.to_string(),
        other => other.to_string(),
    }
}
