//! ClimateVision Storage - SQLite persistence layer.
//!
//! This crate provides durable storage for the ClimateVision platform:
//!
//! - EcoVoice reports (drafts and submissions)
//! - An append-only object bucket for uploaded and generated images
//! - Configuration key-value storage, which backs the local credential store
//!
//! # Example
//!
//! ```no_run
//! use climatevision_core::reports::{NewReport, ReportStatus};
//! use climatevision_core::store::ObjectStore;
//! use climatevision_storage::{Bucket, Database};
//!
//! let db = Database::in_memory().unwrap();
//!
//! // Store an image and get its public URL
//! let bucket = Bucket::new(db.clone(), "generated-images", "http://127.0.0.1:54321");
//! let stored = bucket.put_object("climate-image-1.png", &[0x89, 0x50], "image/png").unwrap();
//! println!("{}", bucket.public_url(&stored.name).unwrap());
//!
//! // List submitted reports
//! for report in db.list_submitted_reports(20).unwrap() {
//!     println!("{} at {}", report.violation_type, report.location);
//! }
//! ```

mod bucket;
mod database;
pub mod error;
pub mod models;
mod pool;
pub mod repository;
mod schema;

pub use bucket::{Bucket, DEFAULT_BUCKET};
pub use database::Database;
pub use error::{Result, StorageError};
pub use models::{ConfigEntry, ObjectRecord};
pub use pool::ConnectionPool;
pub use repository::sha256_hex;
