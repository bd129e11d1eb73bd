//! Database models.
//!
//! Report rows map directly onto the core report types; this module holds
//! the storage-only records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A configuration entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigEntry {
    pub key: String,
    pub value: serde_json::Value,
}

/// An object stored in a bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRecord {
    pub bucket: String,
    pub name: String,
    pub content_type: String,
    pub size: u64,
    /// Hex SHA-256 of `bytes`.
    pub sha256: String,
    pub bytes: Vec<u8>,
    pub created_at: DateTime<Utc>,
}
