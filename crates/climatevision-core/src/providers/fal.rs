//! FAL image-to-video client.
//!
//! Two call styles are supported:
//!
//! - **Run**: one blocking POST to `https://fal.run/<model>`. Used by the relay.
//! - **Queue**: submit to `https://queue.fal.run/<model>`, poll the status URL
//!   until `COMPLETED`, then fetch the result. Used by direct mode so each
//!   status update can be logged while the client waits.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{error_body, http_client};
use crate::error::{ClimateError, Result};
use crate::generation::{GeneratedVideo, VideoJob, VideoProvider};

/// Fast image-to-video model.
pub const DEFAULT_FAL_MODEL: &str = "fal-ai/veo3/fast/image-to-video";

const RUN_BASE: &str = "https://fal.run";
const QUEUE_BASE: &str = "https://queue.fal.run";

/// File size reported when the provider omits one.
const ASSUMED_FILE_SIZE: u64 = 5_000_000;

/// How requests reach FAL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FalCallStyle {
    #[default]
    Run,
    Queue,
}

/// Video generation through FAL.
#[derive(Clone)]
pub struct FalVideoProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    run_base: String,
    queue_base: String,
    style: FalCallStyle,
}

impl std::fmt::Debug for FalVideoProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FalVideoProvider")
            .field("model", &self.model)
            .field("style", &self.style)
            .field("api_key_len", &self.api_key.len())
            .finish()
    }
}

impl FalVideoProvider {
    /// Creates a provider using the synchronous run endpoint.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ClimateError::Configuration(
                "FAL API key not configured.".to_string(),
            ));
        }

        Ok(Self {
            client: http_client(None)?,
            api_key,
            model: DEFAULT_FAL_MODEL.to_string(),
            run_base: RUN_BASE.to_string(),
            queue_base: QUEUE_BASE.to_string(),
            style: FalCallStyle::Run,
        })
    }

    /// Switches to the queue API with status polling.
    pub fn queued(mut self) -> Self {
        self.style = FalCallStyle::Queue;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Overrides both base URLs.
    pub fn with_base_urls(mut self, run_base: &str, queue_base: &str) -> Self {
        self.run_base = run_base.trim_end_matches('/').to_string();
        self.queue_base = queue_base.trim_end_matches('/').to_string();
        self
    }

    pub fn style(&self) -> FalCallStyle {
        self.style
    }

    fn auth_header(&self) -> String {
        format!("Key {}", self.api_key)
    }

    async fn run(&self, body: &FalRequest<'_>) -> Result<FalOutput> {
        let url = format!("{}/{}", self.run_base, self.model);
        debug!(model = %self.model, "POST fal.run");

        let response = self
            .client
            .post(&url)
            .header("Authorization", self.auth_header())
            .json(body)
            .send()
            .await?;

        read_json(response).await
    }

    async fn subscribe(&self, body: &FalRequest<'_>, job: &VideoJob) -> Result<FalOutput> {
        let url = format!("{}/{}", self.queue_base, self.model);
        let response = self
            .client
            .post(&url)
            .header("Authorization", self.auth_header())
            .json(body)
            .send()
            .await?;
        let submitted: QueueSubmission = read_json(response).await?;

        info!(
            request_id = %submitted.request_id,
            model = %self.model,
            "Video request queued"
        );

        loop {
            let response = self
                .client
                .get(format!("{}?logs=1", submitted.status_url))
                .header("Authorization", self.auth_header())
                .send()
                .await?;
            let status: QueueStatus = read_json(response).await?;

            for entry in &status.logs {
                debug!(request_id = %submitted.request_id, "{}", entry.message);
            }

            match status.status.as_str() {
                "COMPLETED" => break,
                "IN_QUEUE" | "IN_PROGRESS" => {
                    info!(
                        request_id = %submitted.request_id,
                        status = %status.status,
                        queue_position = ?status.queue_position,
                        "Video generation status"
                    );
                }
                other => {
                    return Err(ClimateError::provider(format!(
                        "FAL request {} ended with status {}",
                        submitted.request_id, other
                    )));
                }
            }

            tokio::time::sleep(job.settings.poll_interval).await;
        }

        let response = self
            .client
            .get(&submitted.response_url)
            .header("Authorization", self.auth_header())
            .send()
            .await?;
        read_json(response).await
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct FalRequest<'a> {
    prompt: &'a str,
    image_url: String,
    duration: &'static str,
    generate_audio: bool,
    resolution: &'static str,
}

impl<'a> FalRequest<'a> {
    pub(crate) fn from_job(job: &'a VideoJob) -> Self {
        Self {
            prompt: &job.prompt,
            image_url: job.image.to_provider_url(),
            duration: job.settings.duration.as_str(),
            generate_audio: job.settings.generate_audio,
            resolution: job.settings.resolution.as_str(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct QueueSubmission {
    request_id: String,
    status_url: String,
    response_url: String,
}

#[derive(Debug, Deserialize)]
struct QueueStatus {
    status: String,
    #[serde(default)]
    queue_position: Option<u32>,
    #[serde(default)]
    logs: Vec<QueueLog>,
}

#[derive(Debug, Deserialize)]
struct QueueLog {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Default, Deserialize)]
struct FalOutput {
    #[serde(default)]
    video: Option<FalFile>,
}

#[derive(Debug, Deserialize)]
struct FalFile {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    content_type: Option<String>,
    #[serde(default)]
    file_name: Option<String>,
    #[serde(default)]
    file_size: Option<u64>,
}

impl FalOutput {
    fn into_video(self) -> Result<GeneratedVideo> {
        let file = self
            .video
            .filter(|f| f.url.as_deref().is_some_and(|u| !u.is_empty()))
            .ok_or_else(|| ClimateError::provider("No video URL returned from FAL API"))?;

        Ok(GeneratedVideo {
            url: file.url.unwrap_or_default(),
            content_type: file.content_type.unwrap_or_else(|| "video/mp4".to_string()),
            file_name: file
                .file_name
                .unwrap_or_else(|| "climate-video.mp4".to_string()),
            file_size: file.file_size.unwrap_or(ASSUMED_FILE_SIZE),
            source_image_url: None,
            fallback: false,
        })
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let body = error_body(response).await;
        return Err(ClimateError::provider(format!(
            "FAL API error ({}): {}",
            status.as_u16(),
            body
        )));
    }
    Ok(response.json().await?)
}

#[async_trait]
impl VideoProvider for FalVideoProvider {
    fn name(&self) -> &str {
        "fal"
    }

    async fn generate(&self, job: &VideoJob) -> Result<GeneratedVideo> {
        let body = FalRequest::from_job(job);
        let output = match self.style {
            FalCallStyle::Run => self.run(&body).await?,
            FalCallStyle::Queue => self.subscribe(&body, job).await?,
        };
        output.into_video()
    }
}
