pub mod component;
pub mod survey;

pub use component::{DataElement, DataElementType, SurveyComponent};
pub use survey::{LoadError, Survey};
