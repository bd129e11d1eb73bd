//! Prompt classification and the canned-fallback policy.
//!
//! A [`PromptClassifier`] tags a free-text prompt; a [`FallbackPolicy`]
//! maps tags to pre-recorded assets that may stand in for a provider
//! result when the provider is unavailable.

mod fallback;
mod keyword;

pub use fallback::{FallbackAsset, FallbackPolicy, FIRE_BRIGADE_FALLBACK_URL};
pub use keyword::KeywordClassifier;

use serde::{Deserialize, Serialize};

/// Scenario families a prompt can describe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptTag {
    /// Fires and fire-fighting.
    FireResponse,
    /// Floods and water damage.
    Flooding,
    /// Smog and airborne pollution.
    AirPollution,
    /// Tree planting and forest recovery.
    Reforestation,
    /// Solar, wind, and other renewables.
    CleanEnergy,
}

impl PromptTag {
    pub fn name(&self) -> &'static str {
        match self {
            PromptTag::FireResponse => "fire_response",
            PromptTag::Flooding => "flooding",
            PromptTag::AirPollution => "air_pollution",
            PromptTag::Reforestation => "reforestation",
            PromptTag::CleanEnergy => "clean_energy",
        }
    }
}

/// Assigns tags to prompts.
pub trait PromptClassifier: Send + Sync {
    /// Returns every tag the prompt matches, in rule order.
    fn classify(&self, prompt: &str) -> Vec<PromptTag>;
}
