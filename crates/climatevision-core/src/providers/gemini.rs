//! Gemini `generateContent` client.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{error_body, http_client};
use crate::error::{ClimateError, Result};
use crate::generation::{CandidatePart, ImageCandidate, ImageProvider};
use crate::media::{decode_base64, MediaBlob};

/// Image-capable Gemini model.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash-image-preview";

const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Image generation through the Gemini REST API.
#[derive(Debug, Clone)]
pub struct GeminiImageProvider {
    client: reqwest::Client,
    endpoint: String,
    model: String,
}

impl GeminiImageProvider {
    pub fn new() -> Result<Self> {
        Ok(Self {
            client: http_client(Some(Duration::from_secs(180)))?,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_GEMINI_MODEL.to_string(),
        })
    }

    /// Overrides the API base URL.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum RequestPart<'a> {
    Text { text: &'a str },
    Inline { inline_data: InlineData },
}

#[derive(Serialize, Deserialize)]
struct InlineData {
    #[serde(alias = "mimeType")]
    mime_type: String,
    data: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<ResponseCandidate>,
}

#[derive(Deserialize)]
struct ResponseCandidate {
    #[serde(default)]
    content: Option<ResponseContent>,
}

#[derive(Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
    #[serde(default, alias = "inlineData")]
    inline_data: Option<InlineData>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    message: String,
}

/// Maps the wire response into candidates. Undecodable inline payloads
/// become empty images so the caller reports `NoImageData`.
fn into_candidates(response: GenerateResponse) -> Vec<ImageCandidate> {
    response
        .candidates
        .into_iter()
        .map(|candidate| {
            let parts = candidate
                .content
                .map(|c| c.parts)
                .unwrap_or_default()
                .into_iter()
                .filter_map(|part| {
                    if let Some(inline) = part.inline_data {
                        let bytes = decode_base64(&inline.data).unwrap_or_default();
                        Some(CandidatePart::InlineImage(MediaBlob::new(
                            bytes,
                            inline.mime_type,
                        )))
                    } else {
                        part.text.map(CandidatePart::Text)
                    }
                })
                .collect();
            ImageCandidate { parts }
        })
        .collect()
}

/// Pulls the human-readable message out of a Gemini error body.
fn error_message(status: reqwest::StatusCode, body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) if !envelope.error.message.is_empty() => envelope.error.message,
        _ => format!("HTTP {}: {}", status.as_u16(), body.trim()),
    }
}

#[async_trait]
impl ImageProvider for GeminiImageProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(
        &self,
        api_key: &str,
        instruction: &str,
        image: &MediaBlob,
    ) -> Result<Vec<ImageCandidate>> {
        let body = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![
                    RequestPart::Text { text: instruction },
                    RequestPart::Inline {
                        inline_data: InlineData {
                            mime_type: image.mime.clone(),
                            data: image.to_base64(),
                        },
                    },
                ],
            }],
        };

        debug!(model = %self.model, "POST generateContent");

        let response = self
            .client
            .post(self.url())
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = error_body(response).await;
            return Err(ClimateError::provider(error_message(status, &body)));
        }

        let parsed: GenerateResponse = response.json().await?;
        Ok(into_candidates(parsed))
    }
}
