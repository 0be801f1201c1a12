//! Crop disease detection relay.
//!
//! Accepts a crop photo over HTTP, forwards it with a fixed diagnosis prompt
//! to a hosted vision model, and returns the JSON block found in the model's
//! reply. Also serves the upload page that talks to it.
//!
//! ```text
//! browser ──multipart──▶ POST /detect-disease ──image + prompt──▶ Gemini
//!    ▲                            │                                  │
//!    └────────── JSON ◀── extract fenced ```json block ◀──── text ───┘
//! ```

pub mod config;
pub mod diagnosis;
pub mod error;
pub mod extract;
pub mod logging;
pub mod model;
pub mod routes;

pub use config::Config;
pub use diagnosis::{DiagnosisResult, FormatFallback};
pub use extract::{extract_json_block, parse_model_reply, Extraction};
pub use model::{GeminiModel, VisionModel};

use axum::{
    extract::DefaultBodyLimit,
    http::{header, Method},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};

/// Default upload limit when the router is built without a [`Config`].
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Shared, read-only state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub model: Arc<dyn VisionModel>,
    pub strict_schema: bool,
}

impl AppState {
    pub fn new(model: Arc<dyn VisionModel>) -> Self {
        Self {
            model,
            strict_schema: false,
        }
    }

    pub fn with_strict_schema(mut self, strict: bool) -> Self {
        self.strict_schema = strict;
        self
    }
}

/// Build the router: upload page, health check and the diagnosis endpoint.
pub fn app(state: AppState, max_upload_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/", get(routes::index))
        .route("/app.js", get(routes::app_js))
        .route("/health", get(routes::health))
        .route("/detect-disease", post(routes::detect_disease))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
