//! Survey question engine.
//!
//! Decides which questions of a dynamically defined survey are visible for a
//! partially filled set of answers, and computes calculated questions from
//! formulas over other answers. Everything here is pure: inputs are borrowed,
//! nothing is cached between calls.

pub mod answers;
pub mod calculation;
pub mod coerce;
pub mod config;
pub mod criteria;
pub mod formula;
pub mod legacy;
pub mod mandatory;
pub mod normal_range;
pub mod render;
pub mod spec;
pub mod validate;
pub mod visibility;

pub use answers::{
    AnswerMap, actions_from_data, answers_from_data, form_initial_values, values_by_code,
};
pub use calculation::{CalculatedValues, run_calculations, to_fixed};
pub use config::{NormalRange, NormalRangeSpec, ValidationCriteria, parse_config_object};
pub use criteria::{AnswerRule, Conjunction, CriteriaError, VisibilityCriteria, check_json_criteria};
pub use formula::{FormulaEngine, FormulaError};
pub use legacy::fallback_visibility;
pub use mandatory::check_mandatory;
pub use normal_range::{PatientAge, normal_range_by_age};
pub use render::{
    RenderPayload, RenderProgress, RenderQuestion, RenderScreen, RenderStatus,
    build_render_payload, render_json_ui, render_text,
};
pub use spec::{DataElement, DataElementType, LoadError, Survey, SurveyComponent};
pub use validate::{ValidationError, ValidationResult, validate};
pub use visibility::{VisibilityMap, is_visible, resolve_visibility};
