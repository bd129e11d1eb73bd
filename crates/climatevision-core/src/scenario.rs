//! Climate scenarios: effects, solutions, and generation requests.

use serde::{Deserialize, Serialize};

use crate::error::{ClimateError, Result};
use crate::generation::GeneratedVideo;
use crate::media::{ImageKind, MediaBlob};

/// Quick-pick climate effects.
pub const EFFECT_SUGGESTIONS: &[&str] = &[
    "Wildfire spreading across the landscape",
    "Severe flooding and water damage",
    "Air pollution and smog",
    "Earthquake damage and ground cracks",
    "Extreme storm and weather",
];

/// Quick-pick climate solutions.
pub const SOLUTION_SUGGESTIONS: &[&str] = &[
    "Fire brigade extinguishing forest fires with water and foam",
    "Reforestation with lush green trees and vegetation",
    "Solar panels and renewable energy infrastructure",
    "Wind turbines generating clean power",
    "Water conservation and sustainable management",
];

/// Whether a scenario depicts climate damage or mitigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// A climate-damage scenario.
    Effect,
    /// A climate-mitigation scenario.
    Solution,
}

impl Category {
    pub fn name(&self) -> &'static str {
        match self {
            Category::Effect => "Climate Effects",
            Category::Solution => "Solutions",
        }
    }

    /// Returns the preset descriptions offered for this category.
    pub fn suggestions(&self) -> &'static [&'static str] {
        match self {
            Category::Effect => EFFECT_SUGGESTIONS,
            Category::Solution => SOLUTION_SUGGESTIONS,
        }
    }
}

/// A user's request to transform one photo.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub source_image: MediaBlob,
    pub description: String,
    pub category: Category,
}

impl GenerationRequest {
    /// Validates and builds a request. Nothing is sent anywhere.
    pub fn new(source_image: MediaBlob, description: &str, category: Category) -> Result<Self> {
        let description = description.trim();
        if description.is_empty() {
            return Err(ClimateError::Validation(
                "Please provide a description of the effect you want to create".to_string(),
            ));
        }

        if source_image.is_empty() {
            return Err(ClimateError::Validation(
                "Please upload an image first".to_string(),
            ));
        }

        // Trust the bytes, not the declared MIME type.
        let kind = ImageKind::sniff(&source_image.bytes)?;
        let source_image = MediaBlob::new(source_image.bytes, kind.mime());

        Ok(Self {
            source_image,
            description: description.to_string(),
            category,
        })
    }

    /// Returns the instruction text sent alongside the image.
    pub fn instruction(&self) -> String {
        format!(
            "Transform this image based on the following description: {}.\n\n\
             Maintain photorealistic quality and ensure the transformation looks natural and \
             believable. The result should be educational and impactful for climate literacy. \
             Pay attention to details like lighting, atmosphere, and environmental elements to \
             make the scene convincing and dramatic.",
            self.description
        )
    }
}

/// The output of one generation request.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationResult {
    Image(MediaBlob),
    Video(GeneratedVideo),
}
