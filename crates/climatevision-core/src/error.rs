//! Error taxonomy shared by every user-initiated action.

use thiserror::Error;

/// Prefix applied to provider failures before they reach the user.
pub const PROVIDER_PREFIX: &str = "Failed to generate climate effect";

/// Errors produced by generation, storage, and report operations.
#[derive(Debug, Error)]
pub enum ClimateError {
    /// A required credential or relay is not configured.
    #[error("{0}")]
    Configuration(String),

    /// Required input is missing or malformed. Raised before any network call.
    #[error("{0}")]
    Validation(String),

    /// The image provider answered without any candidates.
    #[error("No candidates returned from the image provider")]
    NoResult,

    /// The image provider answered but no candidate carried inline image bytes.
    #[error("No image data found in response")]
    NoImageData,

    /// Upstream call failed or returned no usable payload.
    #[error("{0}")]
    Provider(String),

    /// The wall-clock bound elapsed before the provider answered.
    #[error("generation timed out after {0} seconds")]
    Timeout(u64),

    /// Writing to or reading from object or report storage failed.
    #[error("storage error: {0}")]
    Storage(String),
}

/// Coarse classification of a [`ClimateError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Validation,
    Provider,
    Timeout,
    Storage,
}

impl ErrorKind {
    /// Returns the tag used in logs and relay responses.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Configuration => "configuration",
            ErrorKind::Validation => "validation",
            ErrorKind::Provider => "provider",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Storage => "storage",
        }
    }
}

impl ClimateError {
    /// Returns the taxonomy bucket of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClimateError::Configuration(_) => ErrorKind::Configuration,
            ClimateError::Validation(_) => ErrorKind::Validation,
            ClimateError::NoResult | ClimateError::NoImageData | ClimateError::Provider(_) => {
                ErrorKind::Provider
            }
            ClimateError::Timeout(_) => ErrorKind::Timeout,
            ClimateError::Storage(_) => ErrorKind::Storage,
        }
    }

    /// Renders the single message shown to the user for this error.
    pub fn user_message(&self) -> String {
        match self {
            ClimateError::Configuration(msg) | ClimateError::Validation(msg) => msg.clone(),
            ClimateError::NoResult | ClimateError::NoImageData | ClimateError::Provider(_) => {
                format!("{}: {}", PROVIDER_PREFIX, self)
            }
            ClimateError::Timeout(secs) => format!(
                "Generation did not finish within {} seconds. Try again with a simpler prompt.",
                secs
            ),
            ClimateError::Storage(msg) => format!("Could not save your data: {}", msg),
        }
    }

    /// Convenience constructor for provider failures.
    pub fn provider(msg: impl Into<String>) -> Self {
        ClimateError::Provider(msg.into())
    }
}

impl From<reqwest::Error> for ClimateError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClimateError::Provider(format!("request timed out: {}", err))
        } else {
            ClimateError::Provider(err.to_string())
        }
    }
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, ClimateError>;
