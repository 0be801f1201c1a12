//! The diagnosis payload returned to the upload page.
//!
//! The model is asked to answer in this shape, but nothing forces it to.
//! [`DiagnosisResult::validate`] checks a parsed payload against the shape
//! and the no-disease invariant without modifying it.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Sentinel `disease_name` for a healthy crop.
pub const NO_DISEASE: &str = "No disease detected";

/// Sentinel `confidence` that accompanies [`NO_DISEASE`].
pub const NO_CONFIDENCE: &str = "N/A";

/// Message of the fallback body sent when no JSON block could be found.
pub const INVALID_FORMAT_MESSAGE: &str = "Invalid response format";

/// Structured outcome of one image analysis.
///
/// Field order matches the order the model is asked to emit, so a valid
/// payload re-serializes to the same JSON text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosisResult {
    pub disease_name: String,
    /// Percentage-like label such as `"92%"`, never parsed as a number.
    pub confidence: String,
    pub symptoms: Vec<String>,
    pub causes: Vec<String>,
    pub treatments: Vec<String>,
    pub preventive_measures: Vec<String>,
}

/// Body sent in place of a diagnosis when the reply carried no payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatFallback {
    pub message: String,
}

impl Default for FormatFallback {
    fn default() -> Self {
        Self {
            message: INVALID_FORMAT_MESSAGE.to_string(),
        }
    }
}

/// Why a payload does not match [`DiagnosisResult`].
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("payload does not match the diagnosis schema: {0}")]
    Shape(#[from] serde_json::Error),

    #[error("healthy diagnosis reported with a non-empty '{field}' list")]
    HealthyWithFindings { field: &'static str },
}

impl DiagnosisResult {
    /// The diagnosis reported for a healthy crop.
    #[cfg(test)]
    pub fn healthy() -> Self {
        Self {
            disease_name: NO_DISEASE.to_string(),
            confidence: NO_CONFIDENCE.to_string(),
            symptoms: Vec::new(),
            causes: Vec::new(),
            treatments: Vec::new(),
            preventive_measures: Vec::new(),
        }
    }

    /// True when the model reported no disease.
    pub fn is_healthy(&self) -> bool {
        self.disease_name == NO_DISEASE
    }

    /// The four list sections in display order, keyed by field name.
    pub fn sections(&self) -> [(&'static str, &[String]); 4] {
        [
            ("symptoms", self.symptoms.as_slice()),
            ("causes", self.causes.as_slice()),
            ("treatments", self.treatments.as_slice()),
            ("preventive_measures", self.preventive_measures.as_slice()),
        ]
    }

    /// Check a parsed payload against the diagnosis schema.
    ///
    /// All six keys must be present with the right types. Extra keys are
    /// tolerated. A healthy diagnosis must have empty lists.
    pub fn validate(payload: &Value) -> Result<Self, ValidationError> {
        let diagnosis = Self::deserialize(payload)?;

        if diagnosis.is_healthy() {
            if let Some((field, _)) = diagnosis
                .sections()
                .into_iter()
                .find(|(_, items)| !items.is_empty())
            {
                return Err(ValidationError::HealthyWithFindings { field });
            }
        }

        Ok(diagnosis)
    }
}
