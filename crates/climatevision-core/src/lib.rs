//! ClimateVision Core - generation lifecycle, media, and report flow.
//!
//! This crate provides the client-side logic of the ClimateVision platform:
//!
//! - Media encoding between raw bytes, base64, data URLs, and object URLs
//! - Image effect generation through a multimodal provider
//! - Video generation in direct, relayed, or unconfigured mode
//! - Prompt classification and the canned-fallback policy
//! - EcoVoice report drafting and submission
//! - Session-scoped notifications, credentials, and request tokens
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use climatevision_core::credentials::MemoryCredentials;
//! use climatevision_core::generation::ImageGenerator;
//! use climatevision_core::media::MediaBlob;
//! use climatevision_core::providers::GeminiImageProvider;
//! use climatevision_core::scenario::Category;
//! use climatevision_core::session::SessionContext;
//!
//! # async fn run() -> climatevision_core::Result<()> {
//! let session = SessionContext::new(Arc::new(MemoryCredentials::new()));
//! let generator = ImageGenerator::new(GeminiImageProvider::new()?, session.credentials());
//! let photo = MediaBlob::from_path("forest.jpg")?;
//!
//! let outcome = session
//!     .generate_image(&generator, photo, "Wildfire across the hills", Category::Effect)
//!     .await?;
//! println!("preview at {:?}", outcome.preview_url);
//! # Ok(())
//! # }
//! ```

pub mod classifier;
pub mod credentials;
pub mod error;
pub mod generation;
pub mod media;
pub mod notifications;
pub mod providers;
pub mod reports;
pub mod scenario;
pub mod session;
pub mod store;

pub use error::{ClimateError, ErrorKind, Result};
