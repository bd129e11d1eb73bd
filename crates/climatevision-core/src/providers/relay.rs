//! Backend relay client and its wire format.
//!
//! Request: `{"imageData": "<data url>", "prompt": "..."}`
//!
//! Success: `{"success": true, "videoUrl": "...", "imageUrl": "..."}`
//!
//! Failure: `{"error": "...", "step": "...", "stage"?, "details"?, "received"?}`

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::http_client;
use crate::error::{ClimateError, Result};
use crate::generation::{GeneratedVideo, ImageRef, VideoJob, VideoProvider};

/// Request body accepted by the relay.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
}

impl RelayRequest {
    pub fn new(image_data: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            image_data: Some(image_data.into()),
            prompt: Some(prompt.into()),
        }
    }

    /// Returns both fields when each is present and non-blank.
    pub fn required_fields(&self) -> Option<(&str, &str)> {
        let image = self.image_data.as_deref().filter(|s| !s.trim().is_empty())?;
        let prompt = self.prompt.as_deref().filter(|s| !s.trim().is_empty())?;
        Some((image, prompt))
    }

    pub fn received(&self) -> ReceivedFields {
        ReceivedFields {
            has_image_data: self
                .image_data
                .as_deref()
                .is_some_and(|s| !s.trim().is_empty()),
            has_prompt: self.prompt.as_deref().is_some_and(|s| !s.trim().is_empty()),
        }
    }
}

/// Successful relay response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayResponse {
    pub success: bool,
    pub video_url: String,
    pub image_url: String,
}

/// The relay step at which a request failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelayStep {
    ApiKeyCheck,
    JsonParse,
    ParameterValidation,
    ExecutionError,
}

impl RelayStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelayStep::ApiKeyCheck => "api_key_check",
            RelayStep::JsonParse => "json_parse",
            RelayStep::ParameterValidation => "parameter_validation",
            RelayStep::ExecutionError => "execution_error",
        }
    }
}

/// Sub-stage of an `execution_error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelayStage {
    ImageDecode,
    ImageUpload,
    PublicUrl,
    VideoGeneration,
}

impl RelayStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelayStage::ImageDecode => "image_decode",
            RelayStage::ImageUpload => "image_upload",
            RelayStage::PublicUrl => "public_url",
            RelayStage::VideoGeneration => "video_generation",
        }
    }
}

/// Which required fields the relay saw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceivedFields {
    pub has_image_data: bool,
    pub has_prompt: bool,
}

/// Step-tagged relay failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayErrorBody {
    pub error: String,
    pub step: RelayStep,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<RelayStage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub received: Option<ReceivedFields>,
}

impl RelayErrorBody {
    pub fn new(step: RelayStep, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            step,
            stage: None,
            details: None,
            received: None,
        }
    }

    pub fn with_stage(mut self, stage: RelayStage) -> Self {
        self.stage = Some(stage);
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_received(mut self, received: ReceivedFields) -> Self {
        self.received = Some(received);
        self
    }

    /// Maps the failure onto the client error taxonomy.
    pub fn into_error(self) -> ClimateError {
        let where_ = match self.stage {
            Some(stage) => format!("{}/{}", self.step.as_str(), stage.as_str()),
            None => self.step.as_str().to_string(),
        };
        let message = format!("{} (relay step: {})", self.error, where_);
        match self.step {
            RelayStep::ApiKeyCheck => ClimateError::Configuration(message),
            RelayStep::JsonParse | RelayStep::ParameterValidation => {
                ClimateError::Validation(message)
            }
            RelayStep::ExecutionError => match self.stage {
                Some(RelayStage::ImageUpload) | Some(RelayStage::PublicUrl) => {
                    ClimateError::Storage(message)
                }
                _ => ClimateError::Provider(message),
            },
        }
    }
}

/// Video generation delegated to the backend relay.
#[derive(Debug, Clone)]
pub struct RelayVideoProvider {
    client: reqwest::Client,
    url: String,
}

impl RelayVideoProvider {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: http_client(Some(Duration::from_secs(300)))?,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl VideoProvider for RelayVideoProvider {
    fn name(&self) -> &str {
        "relay"
    }

    async fn generate(&self, job: &VideoJob) -> Result<GeneratedVideo> {
        let image_data = match &job.image {
            ImageRef::Inline(blob) => blob.to_data_url(),
            ImageRef::Url(_) => {
                return Err(ClimateError::Validation(
                    "Relayed video generation needs inline image data".to_string(),
                ))
            }
        };

        debug!(url = %self.url, prompt_len = job.prompt.len(), "POST relay");

        let response = self
            .client
            .post(&self.url)
            .json(&RelayRequest::new(image_data, job.prompt.clone()))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(match serde_json::from_str::<RelayErrorBody>(&body) {
                Ok(tagged) => {
                    warn!(
                        status = status.as_u16(),
                        step = tagged.step.as_str(),
                        stage = tagged.stage.map(|s| s.as_str()),
                        "Relay rejected video request"
                    );
                    tagged.into_error()
                }
                Err(_) => ClimateError::provider(format!(
                    "Relay error ({}): {}",
                    status.as_u16(),
                    body.trim()
                )),
            });
        }

        let parsed: RelayResponse = serde_json::from_str(&body)
            .map_err(|e| ClimateError::provider(format!("Invalid relay response: {}", e)))?;
        if !parsed.success || parsed.video_url.is_empty() {
            return Err(ClimateError::provider("No video URL returned from relay"));
        }

        Ok(GeneratedVideo {
            url: parsed.video_url,
            content_type: "video/mp4".to_string(),
            file_name: "climate-video.mp4".to_string(),
            file_size: 0,
            source_image_url: Some(parsed.image_url),
            fallback: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_uses_camel_case() {
        let request = RelayRequest::new("data:image/png;base64,AA", "Flood");
        let json = serde_json::to_value(request).unwrap();
        assert_eq!(json["imageData"], "data:image/png;base64,AA");
        assert_eq!(json["prompt"], "Flood");
    }

    #[test]
    fn received_flags_blank_fields() {
        let req: RelayRequest = serde_json::from_str(r#"{"prompt":"  "}"#).unwrap();
        assert!(req.required_fields().is_none());
        assert_eq!(
            req.received(),
            ReceivedFields {
                has_image_data: false,
                has_prompt: false
            }
        );
    }

    #[test]
    fn error_body_round_trips_wire_names() {
        let body = RelayErrorBody::new(RelayStep::ParameterValidation, "missing")
            .with_received(ReceivedFields {
                has_image_data: true,
                has_prompt: false,
            });
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["step"], "parameter_validation");
        assert_eq!(json["received"]["hasImageData"], true);
        assert_eq!(json["received"]["hasPrompt"], false);
        assert!(json.get("stage").is_none());
    }

    #[test]
    fn error_steps_map_to_taxonomy() {
        let err =
            RelayErrorBody::new(RelayStep::ApiKeyCheck, "FAL API key not configured").into_error();
        assert!(matches!(err, ClimateError::Configuration(_)));

        let err = RelayErrorBody::new(RelayStep::ExecutionError, "FAL API error (500): down")
            .with_stage(RelayStage::VideoGeneration)
            .into_error();
        assert!(matches!(err, ClimateError::Provider(_)));
        assert!(err.to_string().contains("execution_error/video_generation"));

        let err = RelayErrorBody::new(RelayStep::ExecutionError, "disk full")
            .with_stage(RelayStage::ImageUpload)
            .into_error();
        assert!(matches!(err, ClimateError::Storage(_)));
    }
}
