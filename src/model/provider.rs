//! Vision model trait and request types.
//!
//! Handlers only see [`VisionModel`], so tests can swap the Gemini client for
//! a canned one.

use crate::error::ProviderError;
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use image::ImageFormat;

/// Instruction sent with every image.
pub const DIAGNOSIS_PROMPT: &str = r#"
You are an AI assistant specialized in crop disease detection. Analyze the provided crop image and identify any potential diseases.
Return the output in **JSON format** with the following structure:

{
  "disease_name": "Name of the detected disease",
  "confidence": "Confidence level in percentage",
  "symptoms": ["List of symptoms"],
  "causes": ["List of possible causes"],
  "treatments": ["List of recommended treatments"],
  "preventive_measures": ["List of preventive steps"]
}

If no disease is detected, return:
{
  "disease_name": "No disease detected",
  "confidence": "N/A",
  "symptoms": [],
  "causes": [],
  "treatments": [],
  "preventive_measures": []
}

Analyze carefully and ensure accurate results.
"#;

/// Base64-encoded image ready to inline into a model request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInput {
    /// Base64-encoded image bytes
    pub data: String,
    /// MIME type (e.g., "image/jpeg", "image/png")
    pub media_type: String,
}

impl ImageInput {
    /// Encode uploaded bytes, keeping the declared media type when it names an
    /// image and sniffing the bytes otherwise.
    pub fn from_upload(bytes: &[u8], declared: Option<&str>) -> Self {
        let media_type = match declared {
            Some(mime) if mime.starts_with("image/") => mime.to_string(),
            _ => sniff_media_type(bytes).to_string(),
        };

        Self {
            data: general_purpose::STANDARD.encode(bytes),
            media_type,
        }
    }
}

fn sniff_media_type(bytes: &[u8]) -> &'static str {
    match image::guess_format(bytes) {
        Ok(ImageFormat::Png) => "image/png",
        Ok(ImageFormat::Jpeg) => "image/jpeg",
        Ok(ImageFormat::WebP) => "image/webp",
        Ok(ImageFormat::Gif) => "image/gif",
        Ok(ImageFormat::Bmp) => "image/bmp",
        Ok(ImageFormat::Tiff) => "image/tiff",
        Ok(other) => {
            tracing::warn!("Unsupported upload format {other:?}, sending as image/jpeg");
            "image/jpeg"
        }
        Err(_) => {
            tracing::warn!("Could not recognise upload format, sending as image/jpeg");
            "image/jpeg"
        }
    }
}

/// One prompt + image pair for the model.
#[derive(Debug, Clone)]
pub struct VisionRequest {
    pub prompt: String,
    pub image: ImageInput,
}

impl VisionRequest {
    /// Ask for a crop diagnosis of `image`.
    pub fn diagnose(image: ImageInput) -> Self {
        Self {
            prompt: DIAGNOSIS_PROMPT.to_string(),
            image,
        }
    }
}

/// The model's free-text answer.
#[derive(Debug, Clone)]
pub struct VisionReply {
    pub text: String,
    /// Model identifier that produced the answer
    pub model: String,
    /// Round-trip latency in milliseconds
    pub latency_ms: u64,
}

/// A hosted multimodal model that answers a prompt about an image.
///
/// `async_trait` keeps the trait object-safe for `Arc<dyn VisionModel>`.
#[async_trait]
pub trait VisionModel: Send + Sync {
    /// Model identifier, reported by `/health` and in logs.
    fn name(&self) -> &str;

    async fn generate(&self, request: &VisionRequest) -> Result<VisionReply, ProviderError>;
}
