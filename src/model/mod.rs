//! Upstream vision model integration.

pub mod gemini;
pub mod provider;

pub use gemini::GeminiModel;
pub use provider::{ImageInput, VisionModel, VisionReply, VisionRequest, DIAGNOSIS_PROMPT};
