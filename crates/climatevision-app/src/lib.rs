//! ClimateVision - climate scenario visualization and EcoVoice reporting.
//!
//! This crate provides the command-line application:
//!
//! - The `climatevision` command tree ([`cli`])
//! - CSV export of submitted reports ([`export`])
//!
//! # Usage
//!
//! ```ignore
//! use climatevision_app::export::write_reports_csv;
//! use climatevision_storage::Database;
//!
//! let db = Database::new().expect("Failed to open database");
//! let reports = db.list_submitted_reports(1000).expect("Failed to list reports");
//! let written = write_reports_csv("reports.csv", &reports).expect("Failed to export");
//! println!("Exported {} reports", written);
//! ```

pub mod cli;
pub mod export;

pub use cli::{Cli, Command};
pub use export::{write_reports_csv, ExportError};
