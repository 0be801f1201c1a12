//! HTTP handlers.

use crate::diagnosis::{DiagnosisResult, FormatFallback};
use crate::error::ApiError;
use crate::extract::{parse_model_reply, Extraction};
use crate::model::{ImageInput, VisionRequest};
use crate::AppState;
use axum::{
    body::Bytes,
    extract::{multipart::MultipartRejection, Multipart, State},
    http::header,
    response::{Html, IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::Value;
use std::time::Instant;

/// Multipart field carrying the photo.
pub const IMAGE_FIELD: &str = "image";

pub async fn index() -> Html<&'static str> {
    Html(include_str!("../static/index.html"))
}

pub async fn app_js() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/javascript; charset=utf-8")],
        include_str!("../static/app.js"),
    )
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub model: String,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        model: state.model.name().to_string(),
    })
}

/// `POST /detect-disease`: relay one photo to the model and return its diagnosis.
///
/// Answers 200 with the diagnosis, or with `{"message": "Invalid response format"}`
/// when the reply held no JSON block. Requests without an image get 400 and
/// anything that fails along the way gets 500 with the error message.
pub async fn detect_disease(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ApiError> {
    let start = Instant::now();

    // A body that isn't multipart at all has no image in it either.
    let mut multipart = multipart.map_err(|rejection| {
        tracing::debug!("Not a multipart upload: {rejection}");
        ApiError::NoImage
    })?;

    let (bytes, content_type) = read_image_field(&mut multipart)
        .await?
        .ok_or(ApiError::NoImage)?;

    let image = ImageInput::from_upload(&bytes, content_type.as_deref());
    tracing::info!(
        bytes = bytes.len(),
        media_type = %image.media_type,
        "Received crop image"
    );
    drop(bytes);

    let reply = state.model.generate(&VisionRequest::diagnose(image)).await?;
    tracing::debug!(
        model = %reply.model,
        latency_ms = reply.latency_ms,
        "Model replied"
    );

    let response = match parse_model_reply(&reply.text)? {
        Extraction::Payload(payload) => diagnosis_response(payload, state.strict_schema),
        Extraction::Missing => {
            tracing::warn!("Model reply had no JSON block");
            Json(FormatFallback::default()).into_response()
        }
    };

    tracing::info!(
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Diagnosis complete"
    );
    Ok(response)
}

/// Read the first non-empty `image` field, skipping any other fields.
async fn read_image_field(
    multipart: &mut Multipart,
) -> Result<Option<(Bytes, Option<String>)>, ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }
        let content_type = field.content_type().map(str::to_owned);
        let bytes = field.bytes().await?;
        if bytes.is_empty() {
            // Browsers send an empty part when the file input is blank.
            continue;
        }
        return Ok(Some((bytes, content_type)));
    }
    Ok(None)
}

fn diagnosis_response(payload: Value, strict: bool) -> Response {
    match DiagnosisResult::validate(&payload) {
        Ok(diagnosis) if strict => Json(diagnosis).into_response(),
        Ok(_) => Json(payload).into_response(),
        Err(e) if strict => {
            tracing::warn!(error = %e, "Rejecting reply that doesn't match the schema");
            Json(FormatFallback::default()).into_response()
        }
        Err(e) => {
            tracing::warn!(error = %e, "Passing through reply that doesn't match the schema");
            Json(payload).into_response()
        }
    }
}
