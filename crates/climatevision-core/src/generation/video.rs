//! Video generation in direct, relayed, or unconfigured mode.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::classifier::{FallbackPolicy, KeywordClassifier, PromptClassifier};
use crate::credentials::{self, CredentialStore, EnvLookup, FAL_API_KEY};
use crate::error::{ClimateError, ErrorKind, Result};
use crate::media::MediaBlob;
use crate::providers::{FalVideoProvider, RelayVideoProvider};

/// Wall-clock bound for a whole video generation.
pub const DEFAULT_VIDEO_TIMEOUT: Duration = Duration::from_secs(120);

/// Default delay between queue status polls.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Clip length requested from the provider. Longer clips take longer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VideoDuration {
    #[default]
    #[serde(rename = "4s")]
    FourSeconds,
    #[serde(rename = "8s")]
    EightSeconds,
}

impl VideoDuration {
    pub fn as_str(&self) -> &'static str {
        match self {
            VideoDuration::FourSeconds => "4s",
            VideoDuration::EightSeconds => "8s",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "4s" | "4" => Some(VideoDuration::FourSeconds),
            "8s" | "8" => Some(VideoDuration::EightSeconds),
            _ => None,
        }
    }
}

/// Output resolution requested from the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Resolution {
    #[default]
    #[serde(rename = "720p")]
    Hd720,
    #[serde(rename = "1080p")]
    Hd1080,
}

impl Resolution {
    pub fn as_str(&self) -> &'static str {
        match self {
            Resolution::Hd720 => "720p",
            Resolution::Hd1080 => "1080p",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "720p" => Some(Resolution::Hd720),
            "1080p" => Some(Resolution::Hd1080),
            _ => None,
        }
    }
}

/// Caller-supplied tuning knobs.
///
/// Longer clips and audio generation both increase provider latency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoSettings {
    pub duration: VideoDuration,
    pub generate_audio: bool,
    pub resolution: Resolution,
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for VideoSettings {
    fn default() -> Self {
        Self {
            duration: VideoDuration::FourSeconds,
            generate_audio: false,
            resolution: Resolution::Hd720,
            timeout: DEFAULT_VIDEO_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Source image for a video job.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageRef {
    /// A publicly fetchable URL.
    Url(String),
    /// Inline bytes.
    Inline(MediaBlob),
}

impl ImageRef {
    /// Returns a URL the provider can fetch: the URL itself, or a data URL.
    pub fn to_provider_url(&self) -> String {
        match self {
            ImageRef::Url(url) => url.clone(),
            ImageRef::Inline(blob) => blob.to_data_url(),
        }
    }
}

/// One video generation request.
#[derive(Debug, Clone)]
pub struct VideoJob {
    pub image: ImageRef,
    pub prompt: String,
    pub settings: VideoSettings,
}

impl VideoJob {
    pub fn new(image: ImageRef, prompt: impl Into<String>) -> Self {
        Self {
            image,
            prompt: prompt.into(),
            settings: VideoSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: VideoSettings) -> Self {
        self.settings = settings;
        self
    }
}

/// A playable video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedVideo {
    pub url: String,
    pub content_type: String,
    pub file_name: String,
    pub file_size: u64,
    /// Stored copy of the source image, when a relay produced one.
    pub source_image_url: Option<String>,
    /// True when a canned asset stands in for a provider result.
    pub fallback: bool,
}

/// A backend that turns an image and a prompt into a video URL.
#[async_trait]
pub trait VideoProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn generate(&self, job: &VideoJob) -> Result<GeneratedVideo>;
}

/// How the client reaches a video provider.
#[derive(Clone)]
pub enum VideoMode {
    /// The client holds the credential and calls the provider itself.
    Direct(Arc<dyn VideoProvider>),
    /// A backend relay holds the credential.
    Relayed(Arc<dyn VideoProvider>),
    /// Neither a credential nor a relay is available.
    Unconfigured,
}

impl VideoMode {
    /// Picks the mode: a relay URL wins, then a stored credential.
    pub fn resolve(credentials: &dyn CredentialStore, relay_url: Option<&str>) -> Result<Self> {
        Self::resolve_with(credentials, relay_url, credentials::process_env)
    }

    pub fn resolve_with(
        credentials: &dyn CredentialStore,
        relay_url: Option<&str>,
        env: EnvLookup,
    ) -> Result<Self> {
        if let Some(url) = relay_url.map(str::trim).filter(|u| !u.is_empty()) {
            return Ok(VideoMode::Relayed(Arc::new(RelayVideoProvider::new(url)?)));
        }

        match credentials::resolve_with(credentials, FAL_API_KEY, env)? {
            Some(key) => Ok(VideoMode::Direct(Arc::new(
                FalVideoProvider::new(key)?.queued(),
            ))),
            None => Ok(VideoMode::Unconfigured),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            VideoMode::Direct(_) => "direct",
            VideoMode::Relayed(_) => "relayed",
            VideoMode::Unconfigured => "unconfigured",
        }
    }
}

impl std::fmt::Debug for VideoMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Client for video generation with timeout and fallback policy.
pub struct VideoClient {
    mode: VideoMode,
    classifier: Arc<dyn PromptClassifier>,
    fallback: FallbackPolicy,
}

impl VideoClient {
    /// Creates a client with the keyword classifier and the stock fallback policy.
    pub fn new(mode: VideoMode) -> Self {
        Self {
            mode,
            classifier: Arc::new(KeywordClassifier::new()),
            fallback: FallbackPolicy::stock(),
        }
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn PromptClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_fallback_policy(mut self, policy: FallbackPolicy) -> Self {
        self.fallback = policy;
        self
    }

    pub fn mode(&self) -> &VideoMode {
        &self.mode
    }

    /// Generates a video, bounded by `job.settings.timeout`.
    ///
    /// On expiry the call fails with `Timeout`; nothing is sent upstream,
    /// so provider-side work may continue.
    pub async fn generate(&self, job: &VideoJob) -> Result<GeneratedVideo> {
        if job.prompt.trim().is_empty() {
            return Err(ClimateError::Validation(
                "Please describe the video you want to generate".to_string(),
            ));
        }

        debug!(
            mode = self.mode.name(),
            prompt_len = job.prompt.len(),
            duration = job.settings.duration.as_str(),
            audio = job.settings.generate_audio,
            "Requesting video generation"
        );

        let outcome = match &self.mode {
            VideoMode::Unconfigured => Err(ClimateError::Configuration(
                "Video generation is not configured. Add a FAL API key or a relay URL."
                    .to_string(),
            )),
            VideoMode::Direct(provider) | VideoMode::Relayed(provider) => {
                let secs = job.settings.timeout.as_secs();
                match tokio::time::timeout(job.settings.timeout, provider.generate(job)).await {
                    Ok(result) => result,
                    Err(_) => {
                        warn!(provider = provider.name(), secs, "Video generation timed out");
                        Err(ClimateError::Timeout(secs))
                    }
                }
            }
        };

        match outcome {
            Ok(video) => {
                info!(mode = self.mode.name(), url = %video.url, "Video generation complete");
                Ok(video)
            }
            Err(err) if self.fallback_applies(&err) => {
                let tags = self.classifier.classify(&job.prompt);
                match self.fallback.resolve(&tags) {
                    Some(asset) => {
                        warn!(
                            error = %err,
                            tags = ?tags,
                            "Provider unavailable, substituting fallback video"
                        );
                        Ok(asset.to_video())
                    }
                    None => Err(err),
                }
            }
            Err(err) => Err(err),
        }
    }

    /// Canned results only replace configuration and provider failures,
    /// and never on the relayed path.
    fn fallback_applies(&self, err: &ClimateError) -> bool {
        if matches!(self.mode, VideoMode::Relayed(_)) {
            return false;
        }
        matches!(err.kind(), ErrorKind::Configuration | ErrorKind::Provider)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::FIRE_BRIGADE_FALLBACK_URL;
    use crate::credentials::{no_env, MemoryCredentials};
    use crate::media::fixtures::png_blob;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubVideo {
        fail: bool,
        delay: Duration,
        calls: AtomicUsize,
    }

    impl StubVideo {
        fn ok() -> Arc<Self> {
            Arc::new(Self {
                fail: false,
                delay: Duration::ZERO,
                calls: AtomicUsize::new(0),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                fail: true,
                delay: Duration::ZERO,
                calls: AtomicUsize::new(0),
            })
        }

        fn slow(delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                fail: false,
                delay,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl VideoProvider for StubVideo {
        fn name(&self) -> &str {
            "stub"
        }

        async fn generate(&self, job: &VideoJob) -> Result<GeneratedVideo> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.fail {
                return Err(ClimateError::provider("FAL API error (500): upstream down"));
            }
            Ok(GeneratedVideo {
                url: format!("https://videos.example/{}.mp4", job.prompt.len()),
                content_type: "video/mp4".into(),
                file_name: "climate-video.mp4".into(),
                file_size: 1024,
                source_image_url: None,
                fallback: false,
            })
        }
    }

    fn job(prompt: &str) -> VideoJob {
        VideoJob::new(ImageRef::Inline(png_blob()), prompt)
    }

    #[tokio::test]
    async fn direct_success() {
        let stub = StubVideo::ok();
        let client = VideoClient::new(VideoMode::Direct(stub.clone()));
        let video = client.generate(&job("Wind turbines")).await.unwrap();
        assert!(!video.fallback);
        assert_eq!(stub.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn direct_failure_with_fire_prompt_uses_fallback() {
        let client = VideoClient::new(VideoMode::Direct(StubVideo::failing()));
        let video = client
            .generate(&job("Fire brigade extinguishing forest fires"))
            .await
            .unwrap();
        assert!(video.fallback);
        assert_eq!(video.url, FIRE_BRIGADE_FALLBACK_URL);
    }

    #[tokio::test]
    async fn direct_failure_without_tag_surfaces() {
        let client = VideoClient::new(VideoMode::Direct(StubVideo::failing()));
        let err = client.generate(&job("Earthquake cracks")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Provider);
    }

    #[tokio::test]
    async fn relayed_failure_never_falls_back() {
        let client = VideoClient::new(VideoMode::Relayed(StubVideo::failing()));
        let err = client
            .generate(&job("fire brigade at the ridge"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Provider);
    }

    #[tokio::test]
    async fn unconfigured_fails_closed() {
        let client = VideoClient::new(VideoMode::Unconfigured);
        let err = client.generate(&job("Solar panels")).await.unwrap_err();
        assert!(matches!(err, ClimateError::Configuration(_)));
    }

    #[tokio::test]
    async fn unconfigured_fire_prompt_uses_fallback() {
        let client = VideoClient::new(VideoMode::Unconfigured);
        let video = client.generate(&job("wildfire spreading")).await.unwrap();
        assert!(video.fallback);
    }

    #[tokio::test]
    async fn disabled_policy_fails_closed() {
        let client = VideoClient::new(VideoMode::Direct(StubVideo::failing()))
            .with_fallback_policy(FallbackPolicy::disabled());
        assert!(client.generate(&job("fire brigade")).await.is_err());
    }

    #[tokio::test]
    async fn blank_prompt_is_rejected_before_call() {
        let stub = StubVideo::ok();
        let client = VideoClient::new(VideoMode::Direct(stub.clone()));
        let err = client.generate(&job("  ")).await.unwrap_err();
        assert!(matches!(err, ClimateError::Validation(_)));
        assert_eq!(stub.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_provider_times_out() {
        let client = VideoClient::new(VideoMode::Direct(StubVideo::slow(Duration::from_secs(300))));
        let err = client.generate(&job("fire brigade")).await.unwrap_err();
        // Timeouts are never masked by the fallback policy.
        assert!(matches!(err, ClimateError::Timeout(120)));
    }

    #[test]
    fn mode_resolution() {
        let relay = "http://127.0.0.1:54321/functions/v1/generate-video";
        let empty = MemoryCredentials::new();
        assert!(matches!(
            VideoMode::resolve_with(&empty, None, no_env).unwrap(),
            VideoMode::Unconfigured
        ));
        assert!(matches!(
            VideoMode::resolve_with(&empty, Some(relay), no_env).unwrap(),
            VideoMode::Relayed(_)
        ));

        let with_key = MemoryCredentials::with(FAL_API_KEY, "key-123");
        assert!(matches!(
            VideoMode::resolve_with(&with_key, None, no_env).unwrap(),
            VideoMode::Direct(_)
        ));
        assert!(matches!(
            VideoMode::resolve_with(&with_key, Some(relay), no_env).unwrap(),
            VideoMode::Relayed(_)
        ));
    }

    #[test]
    fn knob_parsing() {
        assert_eq!(VideoDuration::parse("8s"), Some(VideoDuration::EightSeconds));
        assert_eq!(Resolution::parse("1080p"), Some(Resolution::Hd1080));
        assert!(Resolution::parse("4k").is_none());
    }
}
