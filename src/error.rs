//! Error types for the relay.
//!
//! [`ProviderError`] covers the upstream vision model. [`ApiError`] is what a
//! request handler returns; it owns the mapping from failure to HTTP status
//! and the `{"error": ...}` body the upload page expects.

use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Failures talking to the upstream vision model.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// The model answered with a non-success status
    #[error("Model HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The request never got an answer (DNS, TLS, connection reset...)
    #[error("Model request failed: {0}")]
    Transport(String),

    /// The answer was not the JSON envelope we expected
    #[error("Failed to parse model response: {0}")]
    Decode(String),

    /// The answer carried no text
    #[error("Model returned an empty response")]
    EmptyResponse,

    /// No answer within the configured timeout
    #[error("Model did not answer within {0}ms")]
    Timeout(u64),
}

/// Failures surfaced to the caller of `POST /detect-disease`.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("No image uploaded")]
    NoImage,

    #[error("Failed to read upload: {0}")]
    Upload(#[from] MultipartError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("Model reply contained malformed JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NoImage => StatusCode::BAD_REQUEST,
            // Body-limit rejections arrive as multipart errors and keep their status.
            ApiError::Upload(e) if e.status() == StatusCode::PAYLOAD_TOO_LARGE => e.status(),
            ApiError::Upload(_) | ApiError::Provider(_) | ApiError::Parse(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Diagnosis failed");
        } else {
            tracing::warn!(error = %self, status = status.as_u16(), "Rejected upload");
        }

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_image_is_bad_request() {
        assert_eq!(ApiError::NoImage.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::NoImage.to_string(), "No image uploaded");
    }

    #[test]
    fn test_provider_error_is_server_error() {
        let err = ApiError::from(ProviderError::Http {
            status: 429,
            body: "quota exceeded".to_string(),
        });
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "Model HTTP 429: quota exceeded");
    }

    #[test]
    fn test_parse_error_is_server_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{oops").unwrap_err();
        let err = ApiError::from(json_err);
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.to_string().starts_with("Model reply contained malformed JSON"));
    }

    #[test]
    fn test_timeout_message() {
        assert_eq!(
            ProviderError::Timeout(1500).to_string(),
            "Model did not answer within 1500ms"
        );
    }
}
