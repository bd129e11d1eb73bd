//! Persistence seams: object storage and the report table.
//!
//! Both stores are append-oriented. Objects are never overwritten or
//! deleted; reports are only inserted, or updated while still drafts.

use chrono::Utc;

use crate::error::Result;
use crate::reports::{NewReport, Report};

/// Metadata for an object written to storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub bucket: String,
    pub name: String,
    pub content_type: String,
    pub size: u64,
    /// Hex SHA-256 of the stored bytes.
    pub checksum: String,
}

/// An append-only object bucket.
pub trait ObjectStore: Send + Sync {
    /// Writes a new object. Fails if the name is already taken.
    fn put_object(&self, name: &str, bytes: &[u8], content_type: &str) -> Result<StoredObject>;

    /// Returns the publicly fetchable URL for an object name. Fails when
    /// the store has no public address.
    fn public_url(&self, name: &str) -> Result<String>;
}

/// The persisted reports table.
pub trait ReportStore: Send + Sync {
    /// Inserts a row and returns its id.
    fn insert_report(&self, report: &NewReport) -> Result<i64>;

    /// Overwrites a row that is still a draft. Returns false when no draft
    /// with that id exists.
    fn update_draft(&self, id: i64, report: &NewReport) -> Result<bool>;

    fn get_report(&self, id: i64) -> Result<Option<Report>>;

    /// Lists submitted reports, newest first.
    fn list_submitted(&self, limit: i64) -> Result<Vec<Report>>;
}

/// Builds a unique object name: `<prefix>-<unix millis>-<random>.<ext>`.
pub fn unique_object_name(prefix: &str, extension: &str) -> String {
    format!(
        "{}-{}-{:08x}.{}",
        prefix,
        Utc::now().timestamp_millis(),
        rand::random::<u32>(),
        extension
    )
}
