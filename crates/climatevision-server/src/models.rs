//! API request and response models.
//!
//! Relay bodies are shared with the client and live in
//! `climatevision_core::providers::relay`.

use climatevision_core::reports::Report;
use serde::{Deserialize, Serialize};

/// Response body for an object upload.
#[derive(Debug, Serialize, Deserialize)]
pub struct ObjectUploadResponse {
    /// `<bucket>/<name>`.
    #[serde(rename = "Key")]
    pub key: String,
    #[serde(rename = "publicUrl")]
    pub public_url: String,
    pub size: u64,
    pub sha256: String,
}

/// Query parameters for GET /rest/v1/reports.
#[derive(Debug, Deserialize)]
pub struct ReportsQuery {
    /// Maximum number of reports to return (default: 50).
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    50
}

/// Response body for GET /rest/v1/reports.
#[derive(Debug, Serialize, Deserialize)]
pub struct ReportsResponse {
    pub reports: Vec<Report>,
    pub total: usize,
}

/// Response body for POST /rest/v1/reports.
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateReportResponse {
    pub id: i64,
}

/// Response body for GET /health.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// Whether the relay holds a provider credential.
    pub relay_configured: bool,
}
