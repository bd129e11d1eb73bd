//! Image effect generation.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::credentials::{self, CredentialStore, EnvLookup, GEMINI_API_KEY};
use crate::error::{ClimateError, Result};
use crate::media::MediaBlob;
use crate::scenario::{Category, GenerationRequest};

/// One part of a provider candidate.
#[derive(Debug, Clone, PartialEq)]
pub enum CandidatePart {
    Text(String),
    InlineImage(MediaBlob),
}

/// One candidate returned by the provider.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageCandidate {
    pub parts: Vec<CandidatePart>,
}

impl ImageCandidate {
    /// Returns the first non-empty inline image.
    pub fn first_image(&self) -> Option<&MediaBlob> {
        self.parts.iter().find_map(|part| match part {
            CandidatePart::InlineImage(blob) if !blob.is_empty() => Some(blob),
            _ => None,
        })
    }
}

/// A multimodal provider that transforms an image according to text.
#[async_trait]
pub trait ImageProvider: Send + Sync {
    /// Provider name for logs.
    fn name(&self) -> &str;

    /// Sends one request and returns the raw candidates.
    async fn generate(
        &self,
        api_key: &str,
        instruction: &str,
        image: &MediaBlob,
    ) -> Result<Vec<ImageCandidate>>;
}

/// Client that turns a photo and a description into a transformed image.
pub struct ImageGenerator<P> {
    provider: P,
    credentials: Arc<dyn CredentialStore>,
    env: EnvLookup,
}

impl<P: ImageProvider> ImageGenerator<P> {
    pub fn new(provider: P, credentials: Arc<dyn CredentialStore>) -> Self {
        Self {
            provider,
            credentials,
            env: credentials::process_env,
        }
    }

    /// Replaces the environment lookup used ahead of the store.
    pub fn with_env_lookup(mut self, env: EnvLookup) -> Self {
        self.env = env;
        self
    }

    fn api_key(&self) -> Result<Option<String>> {
        credentials::resolve_with(self.credentials.as_ref(), GEMINI_API_KEY, self.env)
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Returns true when a credential is available.
    pub fn is_configured(&self) -> bool {
        matches!(self.api_key(), Ok(Some(_)))
    }

    /// Validates the inputs, then generates.
    pub async fn generate_effect(
        &self,
        image: MediaBlob,
        description: &str,
        category: Category,
    ) -> Result<MediaBlob> {
        let request = GenerationRequest::new(image, description, category)?;
        self.generate(&request).await
    }

    /// Generates a transformed image for a validated request.
    ///
    /// Returns non-empty image bytes or one of `NoResult`, `NoImageData`,
    /// `Provider`, or `Configuration`.
    pub async fn generate(&self, request: &GenerationRequest) -> Result<MediaBlob> {
        let api_key = self.api_key()?.ok_or_else(|| {
            ClimateError::Configuration("Please configure your Gemini API key first.".to_string())
        })?;

        debug!(
            provider = self.provider.name(),
            category = ?request.category,
            description_len = request.description.len(),
            image_len = request.source_image.len(),
            "Requesting image generation"
        );

        let candidates = self
            .provider
            .generate(&api_key, &request.instruction(), &request.source_image)
            .await
            .map_err(|e| {
                warn!(provider = self.provider.name(), "Image generation failed: {}", e);
                e
            })?;

        let first = candidates.first().ok_or(ClimateError::NoResult)?;
        let image = first.first_image().ok_or(ClimateError::NoImageData)?;

        info!(
            provider = self.provider.name(),
            bytes = image.len(),
            mime = %image.mime,
            "Image generation complete"
        );

        Ok(image.clone())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::credentials::{no_env, MemoryCredentials};
    use crate::media::fixtures::{png_blob, PNG_BYTES};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Provider stub that returns a scripted answer and counts calls.
    pub(crate) struct ScriptedImageProvider {
        pub answer: Mutex<Option<Result<Vec<ImageCandidate>>>>,
        pub calls: AtomicUsize,
    }

    impl ScriptedImageProvider {
        pub(crate) fn answering(answer: Result<Vec<ImageCandidate>>) -> Self {
            Self {
                answer: Mutex::new(Some(answer)),
                calls: AtomicUsize::new(0),
            }
        }

        pub(crate) fn with_image() -> Self {
            Self::answering(Ok(vec![ImageCandidate {
                parts: vec![
                    CandidatePart::Text("Here you go".into()),
                    CandidatePart::InlineImage(png_blob()),
                ],
            }]))
        }
    }

    #[async_trait]
    impl ImageProvider for ScriptedImageProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn generate(
            &self,
            _api_key: &str,
            _instruction: &str,
            _image: &MediaBlob,
        ) -> Result<Vec<ImageCandidate>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.answer
                .lock()
                .unwrap()
                .take()
                .unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    fn generator(provider: ScriptedImageProvider) -> ImageGenerator<ScriptedImageProvider> {
        ImageGenerator::new(
            provider,
            Arc::new(MemoryCredentials::with(GEMINI_API_KEY, "test-key")),
        )
        .with_env_lookup(no_env)
    }

    #[tokio::test]
    async fn returns_first_inline_image() {
        let gen = generator(ScriptedImageProvider::with_image());
        let image = gen
            .generate_effect(png_blob(), "Severe flooding", Category::Effect)
            .await
            .unwrap();
        assert_eq!(image.bytes, PNG_BYTES);
        assert_eq!(gen.provider().calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn no_candidates_is_no_result() {
        let gen = generator(ScriptedImageProvider::answering(Ok(vec![])));
        let err = gen
            .generate_effect(png_blob(), "Severe flooding", Category::Effect)
            .await
            .unwrap_err();
        assert!(matches!(err, ClimateError::NoResult));
    }

    #[tokio::test]
    async fn text_only_candidate_is_no_image_data() {
        let gen = generator(ScriptedImageProvider::answering(Ok(vec![ImageCandidate {
            parts: vec![CandidatePart::Text("I cannot do that".into())],
        }])));
        let err = gen
            .generate_effect(png_blob(), "Severe flooding", Category::Effect)
            .await
            .unwrap_err();
        assert!(matches!(err, ClimateError::NoImageData));
    }

    #[tokio::test]
    async fn empty_inline_payload_is_no_image_data() {
        let gen = generator(ScriptedImageProvider::answering(Ok(vec![ImageCandidate {
            parts: vec![CandidatePart::InlineImage(MediaBlob::new(vec![], "image/png"))],
        }])));
        let err = gen
            .generate_effect(png_blob(), "Severe flooding", Category::Effect)
            .await
            .unwrap_err();
        assert!(matches!(err, ClimateError::NoImageData));
    }

    #[tokio::test]
    async fn provider_error_passes_through() {
        let gen = generator(ScriptedImageProvider::answering(Err(ClimateError::provider(
            "HTTP 429: quota",
        ))));
        let err = gen
            .generate_effect(png_blob(), "Severe flooding", Category::Effect)
            .await
            .unwrap_err();
        assert!(matches!(err, ClimateError::Provider(_)));
        assert!(err.user_message().contains("HTTP 429"));
    }

    #[tokio::test]
    async fn blank_description_never_calls_provider() {
        let gen = generator(ScriptedImageProvider::with_image());
        let err = gen
            .generate_effect(png_blob(), "   ", Category::Solution)
            .await
            .unwrap_err();
        assert!(matches!(err, ClimateError::Validation(_)));
        assert_eq!(gen.provider().calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_credential_is_configuration_error() {
        let gen = ImageGenerator::new(
            ScriptedImageProvider::with_image(),
            Arc::new(MemoryCredentials::new()),
        )
        .with_env_lookup(no_env);
        assert!(!gen.is_configured());

        let err = gen
            .generate_effect(png_blob(), "Severe flooding", Category::Effect)
            .await
            .unwrap_err();
        assert!(matches!(err, ClimateError::Configuration(_)));
        assert_eq!(gen.provider().calls.load(Ordering::SeqCst), 0);
    }
}
