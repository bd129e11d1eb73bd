//! Tag-to-asset mapping for canned responses.

use std::collections::HashMap;

use crate::generation::GeneratedVideo;

use super::PromptTag;

/// Pre-recorded fire-brigade clip.
pub const FIRE_BRIGADE_FALLBACK_URL: &str =
    "https://cdn.midjourney.com/video/ae3b755e-e526-4ef1-8168-4c68b97a3af1/0.mp4";

/// A pre-recorded result that can stand in for a provider response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackAsset {
    pub url: String,
    pub content_type: String,
    pub file_name: String,
    pub file_size: u64,
}

impl FallbackAsset {
    /// Creates an MP4 asset.
    pub fn mp4(url: impl Into<String>, file_name: impl Into<String>, file_size: u64) -> Self {
        Self {
            url: url.into(),
            content_type: "video/mp4".to_string(),
            file_name: file_name.into(),
            file_size,
        }
    }

    /// Converts the asset into a video result flagged as a fallback.
    pub fn to_video(&self) -> GeneratedVideo {
        GeneratedVideo {
            url: self.url.clone(),
            content_type: self.content_type.clone(),
            file_name: self.file_name.clone(),
            file_size: self.file_size,
            source_image_url: None,
            fallback: true,
        }
    }
}

/// Maps prompt tags to canned assets used when the provider is unavailable.
///
/// An empty policy fails closed: every provider failure surfaces.
#[derive(Debug, Clone, Default)]
pub struct FallbackPolicy {
    assets: HashMap<PromptTag, FallbackAsset>,
}

impl FallbackPolicy {
    /// Creates a policy with no fallbacks.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Creates the stock policy: fire prompts fall back to the brigade clip.
    pub fn stock() -> Self {
        Self::disabled().with_asset(
            PromptTag::FireResponse,
            FallbackAsset::mp4(
                FIRE_BRIGADE_FALLBACK_URL,
                "fire-brigade-fallback.mp4",
                5_000_000,
            ),
        )
    }

    /// Registers or replaces the asset for a tag.
    pub fn with_asset(mut self, tag: PromptTag, asset: FallbackAsset) -> Self {
        self.assets.insert(tag, asset);
        self
    }

    /// Returns the asset for the first tag that has one.
    pub fn resolve(&self, tags: &[PromptTag]) -> Option<&FallbackAsset> {
        tags.iter().find_map(|tag| self.assets.get(tag))
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}
