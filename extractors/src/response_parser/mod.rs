mod fields;
mod json_shape;
mod key_value;

pub use fields::RawFields;
pub use json_shape::parse_json_shape;
pub use key_value::parse_key_value_shape;

use serde::{Deserialize, Serialize};
use shared_types::VisaRecord;

/// Why a model response could not be turned into a visa record
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseFailure {
    #[error("No JSON object found in response")]
    NoJsonObject,

    #[error("Invalid JSON: {0}")]
    InvalidJson(String),

    #[error("No key=\"value\" pairs found in response")]
    NoKeyValuePairs,

    #[error("Missing or empty country field")]
    MissingCountry,

    #[error("Missing field: {0}")]
    MissingField(&'static str),

    #[error("Unknown visa requirement: {0:?}")]
    UnknownVisaRequirement(String),
}

impl ParseFailure {
    /// Field-level failures mean the shape was recognized but its content was unusable.
    fn is_field_level(&self) -> bool {
        matches!(
            self,
            ParseFailure::MissingCountry
                | ParseFailure::MissingField(_)
                | ParseFailure::UnknownVisaRequirement(_)
        )
    }
}

/// Output convention a model back-end is prompted to follow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseShape {
    /// A JSON object, possibly wrapped in prose
    Json,
    /// Repeated `key="value"` pairs
    KeyValue,
}

impl ResponseShape {
    pub fn parse(&self, response: &str) -> Result<VisaRecord, ParseFailure> {
        match self {
            ResponseShape::Json => parse_json_shape(response),
            ResponseShape::KeyValue => parse_key_value_shape(response),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Response parser needs at least one shape to try")]
pub struct NoShapesConfigured;

/// Tries each configured shape in order and keeps the first success.
#[derive(Debug, Clone)]
pub struct ResponseParser {
    shapes: Vec<ResponseShape>,
}

impl ResponseParser {
    pub fn new(shapes: Vec<ResponseShape>) -> Result<Self, NoShapesConfigured> {
        if shapes.is_empty() {
            return Err(NoShapesConfigured);
        }
        Ok(Self { shapes })
    }

    pub fn shapes(&self) -> &[ResponseShape] {
        &self.shapes
    }

    /// When every shape fails, the reported failure is the first field-level
    /// one if any shape got that far, otherwise the first shape's failure.
    pub fn parse(&self, response: &str) -> Result<VisaRecord, ParseFailure> {
        let mut first_failure: Option<ParseFailure> = None;
        let mut field_failure: Option<ParseFailure> = None;

        for shape in &self.shapes {
            match shape.parse(response) {
                Ok(record) => return Ok(record),
                Err(failure) => {
                    tracing::trace!(?shape, %failure, "Response shape did not match");
                    if failure.is_field_level() && field_failure.is_none() {
                        field_failure = Some(failure.clone());
                    }
                    first_failure.get_or_insert(failure);
                }
            }
        }

        Err(field_failure
            .or(first_failure)
            .unwrap_or(ParseFailure::NoJsonObject))
    }
}

impl Default for ResponseParser {
    fn default() -> Self {
        Self {
            shapes: vec![ResponseShape::Json, ResponseShape::KeyValue],
        }
    }
}
