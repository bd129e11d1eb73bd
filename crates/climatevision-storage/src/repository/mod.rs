//! Database repositories for each table.

pub mod config;
pub mod objects;
pub mod reports;

pub use config::ConfigRepo;
pub use objects::{sha256_hex, ObjectsRepo};
pub use reports::ReportsRepo;

use chrono::{DateTime, Utc};

/// Parses a stored timestamp, accepting RFC 3339 or SQLite's `datetime()` format.
pub(crate) fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|dt| dt.and_utc())
        })
        .unwrap_or_else(|_| Utc::now())
}
