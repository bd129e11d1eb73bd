//! Session-scoped state and the generation lifecycle.
//!
//! A [`SessionContext`] is created when a session starts and dropped when
//! it ends. It owns everything that would otherwise be global: the
//! notification list, the credential store handle, the object-URL
//! registry, and the current generation result.
//!
//! Each generation call takes a [`RequestToken`]. Starting a new request
//! invalidates the previous result, and a response that arrives for a
//! superseded token is discarded instead of overwriting newer state.

use std::sync::{Arc, Mutex};

use chrono::Utc;
use tracing::{debug, info};

use crate::credentials::CredentialStore;
use crate::error::Result;
use crate::generation::{ImageGenerator, ImageProvider, VideoClient, VideoJob};
use crate::media::{download_file_name, ImageKind, MediaBlob, ObjectUrlRegistry};
use crate::notifications::NotificationCenter;
use crate::scenario::{Category, GenerationResult};

/// Identifies one generation request within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestToken(u64);

impl RequestToken {
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// What happened to a finished request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The result became the session's current result.
    Applied,
    /// A newer request started first; the result was dropped.
    Superseded,
}

#[derive(Debug, Default)]
struct GenerationState {
    latest: u64,
    result: Option<GenerationResult>,
    preview_url: Option<String>,
}

/// The current generation result and its preview handle.
#[derive(Debug)]
pub struct GenerationSession {
    state: Mutex<GenerationState>,
    object_urls: ObjectUrlRegistry,
}

impl GenerationSession {
    pub fn new(object_urls: ObjectUrlRegistry) -> Self {
        Self {
            state: Mutex::new(GenerationState::default()),
            object_urls,
        }
    }

    /// Starts a request. The previous result is discarded.
    pub fn begin(&self) -> RequestToken {
        let mut state = self.state.lock().unwrap();
        state.latest += 1;
        self.clear_result(&mut state);
        debug!(token = state.latest, "Generation request started");
        RequestToken(state.latest)
    }

    /// Applies a result if `token` is still the newest request.
    pub fn complete(&self, token: RequestToken, result: GenerationResult) -> Completion {
        let mut state = self.state.lock().unwrap();
        if token.0 != state.latest {
            debug!(
                token = token.0,
                latest = state.latest,
                "Discarding superseded generation result"
            );
            return Completion::Superseded;
        }

        self.clear_result(&mut state);
        state.preview_url = Some(match &result {
            GenerationResult::Image(blob) => self.object_urls.create(blob.clone()),
            GenerationResult::Video(video) => video.url.clone(),
        });
        state.result = Some(result);
        Completion::Applied
    }

    /// Returns true if `token` is still the newest request.
    pub fn is_current(&self, token: RequestToken) -> bool {
        self.state.lock().unwrap().latest == token.0
    }

    /// Clears the result and revokes its preview handle.
    pub fn reset(&self) {
        let mut state = self.state.lock().unwrap();
        self.clear_result(&mut state);
    }

    pub fn result(&self) -> Option<GenerationResult> {
        self.state.lock().unwrap().result.clone()
    }

    pub fn preview_url(&self) -> Option<String> {
        self.state.lock().unwrap().preview_url.clone()
    }

    fn clear_result(&self, state: &mut GenerationState) {
        if let Some(url) = state.preview_url.take() {
            self.object_urls.revoke(&url);
        }
        state.result = None;
    }
}

/// Result of a generation call made through the session.
#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub token: RequestToken,
    pub result: GenerationResult,
    pub completion: Completion,
    /// Preview handle, set only when the result was applied.
    pub preview_url: Option<String>,
}

/// Everything one user session owns.
pub struct SessionContext {
    notifications: NotificationCenter,
    credentials: Arc<dyn CredentialStore>,
    object_urls: ObjectUrlRegistry,
    generation: GenerationSession,
}

impl SessionContext {
    pub fn new(credentials: Arc<dyn CredentialStore>) -> Self {
        Self::with_notifications(credentials, NotificationCenter::new())
    }

    pub fn with_notifications(
        credentials: Arc<dyn CredentialStore>,
        notifications: NotificationCenter,
    ) -> Self {
        let object_urls = ObjectUrlRegistry::new();
        Self {
            notifications,
            credentials,
            generation: GenerationSession::new(object_urls.clone()),
            object_urls,
        }
    }

    pub fn notifications(&self) -> &NotificationCenter {
        &self.notifications
    }

    pub fn credentials(&self) -> Arc<dyn CredentialStore> {
        self.credentials.clone()
    }

    pub fn object_urls(&self) -> &ObjectUrlRegistry {
        &self.object_urls
    }

    pub fn generation(&self) -> &GenerationSession {
        &self.generation
    }

    /// Generates an image effect and makes it the current result.
    ///
    /// Every call ends in one notification, unless a newer request has
    /// already replaced it.
    pub async fn generate_image<P: ImageProvider>(
        &self,
        generator: &ImageGenerator<P>,
        image: MediaBlob,
        description: &str,
        category: Category,
    ) -> Result<GenerationOutcome> {
        let token = self.generation.begin();

        match generator.generate_effect(image, description, category).await {
            Ok(blob) => {
                let outcome = self.finish(token, GenerationResult::Image(blob));
                if outcome.completion == Completion::Applied {
                    self.notifications.success("Climate visualization generated");
                }
                Ok(outcome)
            }
            Err(err) => {
                if self.generation.is_current(token) {
                    self.notifications.report(&err);
                }
                Err(err)
            }
        }
    }

    /// Generates a video and makes it the current result.
    pub async fn generate_video(
        &self,
        client: &VideoClient,
        job: &VideoJob,
    ) -> Result<GenerationOutcome> {
        let token = self.generation.begin();

        match client.generate(job).await {
            Ok(video) => {
                let fallback = video.fallback;
                let outcome = self.finish(token, GenerationResult::Video(video));
                if outcome.completion == Completion::Applied {
                    if fallback {
                        self.notifications
                            .info("Video provider unavailable. Showing a pre-recorded video.");
                    } else {
                        self.notifications.success("Video generated");
                    }
                }
                Ok(outcome)
            }
            Err(err) => {
                if self.generation.is_current(token) {
                    self.notifications.report(&err);
                }
                Err(err)
            }
        }
    }

    /// Returns the current image result with its download file name.
    pub fn download(&self, effect: &str) -> Option<(String, MediaBlob)> {
        match self.generation.result()? {
            GenerationResult::Image(blob) => {
                let kind = blob.image_kind().unwrap_or(ImageKind::Png);
                let name = download_file_name(effect, Utc::now().timestamp_millis(), kind);
                Some((name, blob))
            }
            GenerationResult::Video(_) => None,
        }
    }

    /// Discards the current result, as when the user starts over.
    pub fn reset(&self) {
        self.generation.reset();
    }

    fn finish(&self, token: RequestToken, result: GenerationResult) -> GenerationOutcome {
        let completion = self.generation.complete(token, result.clone());
        let preview_url = match completion {
            Completion::Applied => self.generation.preview_url(),
            Completion::Superseded => None,
        };
        GenerationOutcome {
            token,
            result,
            completion,
            preview_url,
        }
    }
}

impl Drop for SessionContext {
    fn drop(&mut self) {
        let revoked = self.object_urls.revoke_all();
        if revoked > 0 {
            info!(revoked, "Session ended, released object URLs");
        }
    }
}
