//! Google Gemini provider using the `generateContent` API.
//!
//! Sends the prompt and the base64 image as inline data in a single user turn.

use super::provider::{VisionModel, VisionReply, VisionRequest};
use crate::error::ProviderError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-1.5-pro-latest";

/// Gemini client. Holds one pooled `reqwest::Client` for the process.
pub struct GeminiModel {
    api_base: String,
    api_key: String,
    model: String,
    timeout: Option<Duration>,
    client: reqwest::Client,
}

impl GeminiModel {
    pub fn new(api_base: &str, api_key: &str, model: &str) -> Self {
        Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            timeout: None,
            client: reqwest::Client::new(),
        }
    }

    /// Give up on a request after `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.api_base, self.model)
    }

    /// Timeouts can fire while sending or while reading the body.
    fn request_error(&self, e: reqwest::Error) -> ProviderError {
        if e.is_timeout() {
            ProviderError::Timeout(self.timeout.map_or(0, |t| t.as_millis() as u64))
        } else {
            ProviderError::Transport(e.without_url().to_string())
        }
    }
}

// --- Request types ---

#[derive(Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Text { text: &'a str },
    InlineData { inline_data: InlineData<'a> },
}

#[derive(Serialize)]
struct InlineData<'a> {
    mime_type: &'a str,
    data: &'a str,
}

impl<'a> GenerateContentRequest<'a> {
    fn from_request(request: &'a VisionRequest) -> Self {
        Self {
            contents: vec![Content {
                role: "user",
                parts: vec![
                    Part::Text {
                        text: &request.prompt,
                    },
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: &request.image.media_type,
                            data: &request.image.data,
                        },
                    },
                ],
            }],
        }
    }
}

// --- Response types ---

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(rename = "modelVersion")]
    model_version: Option<String>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate.
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl VisionModel for GeminiModel {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: &VisionRequest) -> Result<VisionReply, ProviderError> {
        let start = Instant::now();
        let body = GenerateContentRequest::from_request(request);

        tracing::debug!(
            model = %self.model,
            media_type = %request.image.media_type,
            "Sending request to Gemini"
        );

        let mut builder = self
            .client
            .post(self.endpoint())
            .query(&[("key", &self.api_key)])
            .json(&body);
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }

        let resp = builder.send().await.map_err(|e| self.request_error(e))?;

        let status = resp.status();
        let text = resp.text().await.map_err(|e| self.request_error(e))?;

        tracing::debug!(
            %status,
            body = &text[..floor_char_boundary(&text, 500)],
            "Gemini response"
        );

        if !status.is_success() {
            return Err(ProviderError::Http {
                status: status.as_u16(),
                body: text,
            });
        }

        let parsed: GenerateContentResponse =
            serde_json::from_str(&text).map_err(|e| ProviderError::Decode(e.to_string()))?;

        let reply = parsed.text();
        if reply.trim().is_empty() {
            return Err(ProviderError::EmptyResponse);
        }

        Ok(VisionReply {
            text: reply,
            model: parsed.model_version.unwrap_or_else(|| self.model.clone()),
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }
}

/// Largest char boundary at or below `max`, for log previews.
fn floor_char_boundary(s: &str, max: usize) -> usize {
    if s.len() <= max {
        return s.len();
    }
    (0..=max).rev().find(|&i| s.is_char_boundary(i)).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::provider::ImageInput;
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Local upstream that accepts one request, writes `head` and then stalls.
    async fn stalling_upstream(head: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 64 * 1024];
            let _ = socket.read(&mut buf).await;
            let _ = socket.write_all(head.as_bytes()).await;
            tokio::time::sleep(Duration::from_secs(30)).await;
        });
        format!("http://{addr}")
    }

    fn local_model(api_base: &str) -> GeminiModel {
        let mut model = GeminiModel::new(api_base, "k", "gemini-test")
            .with_timeout(Some(Duration::from_millis(200)));
        model.client = reqwest::Client::builder().no_proxy().build().unwrap();
        model
    }

    fn diagnose_request() -> VisionRequest {
        VisionRequest::diagnose(ImageInput::from_upload(&[1, 2, 3], Some("image/png")))
    }

    #[test]
    fn test_request_body_shape() {
        let request = VisionRequest {
            prompt: "Diagnose".to_string(),
            image: ImageInput::from_upload(&[1, 2, 3], Some("image/png")),
        };
        let body = serde_json::to_value(GenerateContentRequest::from_request(&request)).unwrap();
        assert_eq!(
            body,
            json!({
                "contents": [{
                    "role": "user",
                    "parts": [
                        { "text": "Diagnose" },
                        { "inline_data": { "mime_type": "image/png", "data": "AQID" } }
                    ]
                }]
            })
        );
    }

    #[test]
    fn test_response_parts_are_concatenated() {
        let parsed: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [{ "text": "```json\n{\"a\": " }, { "text": "1}\n```" }]
                },
                "finishReason": "STOP"
            }],
            "modelVersion": "gemini-1.5-pro-002"
        }))
        .unwrap();
        assert_eq!(parsed.text(), "```json\n{\"a\": 1}\n```");
        assert_eq!(parsed.model_version.as_deref(), Some("gemini-1.5-pro-002"));
    }

    #[test]
    fn test_blocked_response_has_no_text() {
        let parsed: GenerateContentResponse = serde_json::from_value(json!({
            "promptFeedback": { "blockReason": "SAFETY" }
        }))
        .unwrap();
        assert_eq!(parsed.text(), "");
    }

    #[test]
    fn test_endpoint_uses_model_and_trims_base() {
        let model = GeminiModel::new("http://localhost:8080/", "key", "gemini-test");
        assert_eq!(
            model.endpoint(),
            "http://localhost:8080/v1beta/models/gemini-test:generateContent"
        );
        assert_eq!(model.name(), "gemini-test");
    }

    #[tokio::test]
    async fn test_stalled_response_head_is_timeout() {
        let base = stalling_upstream("").await;
        let err = local_model(&base)
            .generate(&diagnose_request())
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Timeout(200)), "{err:?}");
    }

    #[tokio::test]
    async fn test_stalled_response_body_is_timeout() {
        let base =
            stalling_upstream("HTTP/1.1 200 OK\r\ncontent-length: 100\r\n\r\n{").await;
        let err = local_model(&base)
            .generate(&diagnose_request())
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Timeout(200)), "{err:?}");
    }

    #[test]
    fn test_floor_char_boundary() {
        assert_eq!(floor_char_boundary("short", 500), 5);
        // "é" is two bytes; index 1 splits it
        assert_eq!(floor_char_boundary("éa", 1), 0);
    }
}
