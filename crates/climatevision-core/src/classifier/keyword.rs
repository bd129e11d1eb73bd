//! Regex-based prompt tagger.
//!
//! Tags prompts with the scenario families they describe so that policy
//! decisions (such as canned fallbacks) never depend on ad-hoc substring
//! checks at the call site.

use regex::{Regex, RegexSet};

use super::{PromptClassifier, PromptTag};
use crate::error::{ClimateError, Result};

/// Patterns for a single tag.
struct TagPatterns {
    tag: PromptTag,
    /// Regex set for fast multi-pattern matching.
    regex_set: RegexSet,
    /// Individual regexes, kept for reporting which term matched.
    regexes: Vec<Regex>,
}

/// Keyword classifier with one pattern group per tag.
pub struct KeywordClassifier {
    patterns: Vec<TagPatterns>,
}

impl KeywordClassifier {
    /// Creates a classifier with the default scenario vocabulary.
    pub fn new() -> Self {
        Self {
            patterns: Self::build_default_patterns(),
        }
    }

    /// Creates a classifier with no rules.
    pub fn empty() -> Self {
        Self {
            patterns: Vec::new(),
        }
    }

    /// Adds a rule group. Patterns are matched against the lowercased prompt.
    pub fn with_rule(mut self, tag: PromptTag, patterns: &[&str]) -> Result<Self> {
        let group = Self::build_tag_patterns(tag, patterns)
            .map_err(|e| ClimateError::Validation(format!("invalid classifier pattern: {}", e)))?;
        self.patterns.push(group);
        Ok(self)
    }

    /// Returns the first matched term for a tag, if any.
    pub fn matched_term(&self, prompt: &str, tag: PromptTag) -> Option<String> {
        let lower = prompt.to_lowercase();
        self.patterns
            .iter()
            .filter(|p| p.tag == tag)
            .flat_map(|p| p.regexes.iter())
            .find_map(|r| r.find(&lower).map(|m| m.as_str().to_string()))
    }

    fn build_default_patterns() -> Vec<TagPatterns> {
        let groups: [(PromptTag, &[&str]); 5] = [
            // Substring stems on purpose: "wildfire" and "firefighters" count.
            (PromptTag::FireResponse, &[r"fire", r"extinguish", r"brigade"]),
            (PromptTag::Flooding, &[r"flood", r"\bstorm\s*surge\b", r"\bwater\s+damage\b"]),
            (PromptTag::AirPollution, &[r"\bsmog\b", r"\bair\s+pollution\b", r"\bsmoke"]),
            (PromptTag::Reforestation, &[r"reforest", r"\bplant(ing)?\s+trees\b"]),
            (
                PromptTag::CleanEnergy,
                &[r"\bsolar\b", r"\bwind\s+turbines?\b", r"\brenewable"],
            ),
        ];

        groups
            .iter()
            .map(|(tag, patterns)| {
                Self::build_tag_patterns(*tag, patterns).expect("built-in patterns compile")
            })
            .collect()
    }

    fn build_tag_patterns(
        tag: PromptTag,
        patterns: &[&str],
    ) -> std::result::Result<TagPatterns, regex::Error> {
        let regex_set = RegexSet::new(patterns)?;
        let regexes = patterns
            .iter()
            .map(|p| Regex::new(p))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(TagPatterns {
            tag,
            regex_set,
            regexes,
        })
    }
}

impl Default for KeywordClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptClassifier for KeywordClassifier {
    fn classify(&self, prompt: &str) -> Vec<PromptTag> {
        let lower = prompt.to_lowercase();
        let mut tags = Vec::new();

        for group in &self.patterns {
            if group.regex_set.is_match(&lower) && !tags.contains(&group.tag) {
                tags.push(group.tag);
            }
        }

        tags
    }
}
