//! Planner error types.

use thiserror::Error;

use crate::inference::InferenceError;

/// Why no JSON object could be recovered from model output.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The text has no `{ ... }` span at all.
    #[error("no JSON object found in: {text}")]
    NotFound { text: String },

    /// A brace span exists but is not valid JSON.
    #[error("invalid JSON extracted: {candidate}: {source}")]
    MalformedJson {
        candidate: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors from the question → plan flow.
#[derive(Debug, Error)]
pub enum PlannerError {
    /// The model's reply did not contain a usable JSON object.
    #[error("model did not return valid JSON: {source}")]
    Extraction {
        raw_response: String,
        #[source]
        source: ExtractError,
    },

    /// The JSON object is missing required plan fields.
    #[error("plan is missing required fields: {reason}")]
    InvalidPlan { raw_response: String, reason: String },

    /// The plan names a device that is not in the testbed.
    #[error("device '{device}' not found; valid devices: {}", valid.join(", "))]
    UnknownDevice { device: String, valid: Vec<String> },

    /// The testbed file could not be read or has no devices.
    #[error("testbed error: {reason}")]
    Testbed { reason: String },

    /// The language model call failed.
    #[error(transparent)]
    Inference(#[from] InferenceError),
}

impl PlannerError {
    /// The raw model reply, when the failure happened after the model answered.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            PlannerError::Extraction { raw_response, .. }
            | PlannerError::InvalidPlan { raw_response, .. } => Some(raw_response),
            _ => None,
        }
    }
}
