//! Application state for the API server.

use std::sync::Arc;

use climatevision_core::generation::{VideoProvider, VideoSettings};
use climatevision_storage::{Bucket, Database, DEFAULT_BUCKET};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Database connection.
    pub db: Arc<Database>,
    /// Bucket the relay writes source images to.
    pub bucket: Bucket,
    /// Base URL used to build public object URLs.
    pub public_base_url: String,
    /// Video provider holding the server-side credential. `None` when the
    /// credential is absent; every relay call then fails `api_key_check`.
    pub video_provider: Option<Arc<dyn VideoProvider>>,
    /// Knobs sent with every relayed request.
    pub video_settings: VideoSettings,
}

impl AppState {
    /// Creates state over a database with no video provider.
    pub fn new(db: Database, public_base_url: impl Into<String>) -> Self {
        let public_base_url = public_base_url.into().trim_end_matches('/').to_string();
        Self {
            bucket: Bucket::new(db.clone(), DEFAULT_BUCKET, public_base_url.clone()),
            db: Arc::new(db),
            public_base_url,
            video_provider: None,
            video_settings: VideoSettings::default(),
        }
    }

    /// Creates application state with default in-memory database.
    pub fn in_memory() -> Self {
        Self::new(
            Database::in_memory().expect("Failed to create in-memory database"),
            "http://127.0.0.1:54321",
        )
    }

    /// Uses a different bucket for relay uploads.
    pub fn with_bucket(mut self, name: impl Into<String>) -> Self {
        self.bucket = Bucket::new((*self.db).clone(), name, self.public_base_url.clone());
        self
    }

    pub fn with_video_provider(mut self, provider: Arc<dyn VideoProvider>) -> Self {
        self.video_provider = Some(provider);
        self
    }

    pub fn with_video_settings(mut self, settings: VideoSettings) -> Self {
        self.video_settings = settings;
        self
    }

    /// Public URL for any object in any bucket.
    pub fn public_url(&self, bucket: &str, name: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.public_base_url, bucket, name
        )
    }
}
