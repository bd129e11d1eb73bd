//! High-level database interface.

use std::path::PathBuf;

use climatevision_core::credentials::CredentialStore;
use climatevision_core::reports::{NewReport, Report, ReportStatus};
use climatevision_core::store::ReportStore;
use directories::ProjectDirs;
use tracing::{debug, info};

use crate::error::{Result, StorageError};
use crate::models::{ConfigEntry, ObjectRecord};
use crate::pool::ConnectionPool;
use crate::repository::{ConfigRepo, ObjectsRepo, ReportsRepo};

/// High-level database interface for ClimateVision.
#[derive(Clone)]
pub struct Database {
    pool: ConnectionPool,
}

impl Database {
    /// Create a new database in the default app data directory.
    pub fn new() -> Result<Self> {
        Self::with_path(Self::default_db_path()?)
    }

    /// Create a new database at a specific path.
    pub fn with_path(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        info!("Opening database at: {:?}", path);
        let pool = ConnectionPool::new(&path)?;

        Ok(Self { pool })
    }

    /// Create an in-memory database (for testing).
    pub fn in_memory() -> Result<Self> {
        let pool = ConnectionPool::in_memory()?;
        Ok(Self { pool })
    }

    /// Get the default database path.
    pub fn default_db_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("org", "climatevision", "climatevision")
            .ok_or_else(|| StorageError::Config("Could not determine app data directory".into()))?;

        Ok(proj_dirs.data_dir().join("climatevision.db"))
    }

    // === Reports ===

    /// Insert a report.
    pub fn insert_report(&self, report: &NewReport) -> Result<i64> {
        let conn = self.pool.get()?;
        let id = ReportsRepo::insert(&conn, report)?;
        debug!(id, status = report.status.as_str(), "Report inserted");
        Ok(id)
    }

    /// Overwrite a draft. Returns false if no draft has this id.
    pub fn update_draft_report(&self, id: i64, report: &NewReport) -> Result<bool> {
        let conn = self.pool.get()?;
        ReportsRepo::update_draft(&conn, id, report)
    }

    /// Get a report by id.
    pub fn get_report(&self, id: i64) -> Result<Option<Report>> {
        let conn = self.pool.get()?;
        ReportsRepo::get_by_id(&conn, id)
    }

    /// List submitted reports, newest first.
    pub fn list_submitted_reports(&self, limit: i64) -> Result<Vec<Report>> {
        let conn = self.pool.get()?;
        ReportsRepo::list_by_status(&conn, ReportStatus::Submitted, limit)
    }

    /// Count reports with a status.
    pub fn count_reports(&self, status: ReportStatus) -> Result<i64> {
        let conn = self.pool.get()?;
        ReportsRepo::count_by_status(&conn, status)
    }

    // === Objects ===

    /// Write a new object into a bucket.
    pub fn put_object(
        &self,
        bucket: &str,
        name: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<ObjectRecord> {
        let conn = self.pool.get()?;
        ObjectsRepo::insert(&conn, bucket, name, content_type, bytes)
    }

    /// Read an object.
    pub fn get_object(&self, bucket: &str, name: &str) -> Result<Option<ObjectRecord>> {
        let conn = self.pool.get()?;
        ObjectsRepo::get(&conn, bucket, name)
    }

    /// Count the objects in a bucket.
    pub fn count_objects(&self, bucket: &str) -> Result<i64> {
        let conn = self.pool.get()?;
        ObjectsRepo::count(&conn, bucket)
    }

    // === Config ===

    /// Get a config value.
    pub fn get_config(&self, key: &str) -> Result<Option<ConfigEntry>> {
        let conn = self.pool.get()?;
        ConfigRepo::get(&conn, key)
    }

    /// Set a config value.
    pub fn set_config(&self, key: &str, value: &serde_json::Value) -> Result<()> {
        let conn = self.pool.get()?;
        ConfigRepo::set(&conn, key, value)
    }

    /// Delete a config value.
    pub fn delete_config(&self, key: &str) -> Result<bool> {
        let conn = self.pool.get()?;
        ConfigRepo::delete(&conn, key)
    }

    /// Get all config values.
    pub fn get_all_config(&self) -> Result<Vec<ConfigEntry>> {
        let conn = self.pool.get()?;
        ConfigRepo::get_all(&conn)
    }
}

impl ReportStore for Database {
    fn insert_report(&self, report: &NewReport) -> climatevision_core::Result<i64> {
        Ok(Database::insert_report(self, report)?)
    }

    fn update_draft(&self, id: i64, report: &NewReport) -> climatevision_core::Result<bool> {
        Ok(self.update_draft_report(id, report)?)
    }

    fn get_report(&self, id: i64) -> climatevision_core::Result<Option<Report>> {
        Ok(Database::get_report(self, id)?)
    }

    fn list_submitted(&self, limit: i64) -> climatevision_core::Result<Vec<Report>> {
        Ok(self.list_submitted_reports(limit)?)
    }
}

/// Credentials live in the config table as JSON strings.
impl CredentialStore for Database {
    fn get(&self, key: &str) -> climatevision_core::Result<Option<String>> {
        let conn = self.pool.get()?;
        Ok(ConfigRepo::get_string(&conn, key)?)
    }

    fn set(&self, key: &str, value: &str) -> climatevision_core::Result<()> {
        Ok(self.set_config(key, &serde_json::Value::String(value.to_string()))?)
    }

    fn remove(&self, key: &str) -> climatevision_core::Result<bool> {
        Ok(self.delete_config(key)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use climatevision_core::credentials::{self, GEMINI_API_KEY};
    use climatevision_core::notifications::NotificationCenter;
    use climatevision_core::reports::{ReportForm, ReportService};
    use climatevision_core::ClimateError;
    use std::sync::Arc;

    use crate::bucket::Bucket;

    #[test]
    fn test_in_memory_database() {
        let db = Database::in_memory().unwrap();
        assert_eq!(db.count_reports(ReportStatus::Submitted).unwrap(), 0);
        assert_eq!(db.count_objects("generated-images").unwrap(), 0);
    }

    #[test]
    fn test_with_path_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("climatevision.db");

        let db = Database::with_path(&path).unwrap();
        db.set_config("k", &serde_json::json!("v")).unwrap();

        assert!(path.exists());
    }

    #[test]
    fn test_credentials_round_trip() {
        let db = Database::in_memory().unwrap();

        credentials::save(&db, GEMINI_API_KEY, "  AIza-local  ").unwrap();
        assert_eq!(
            CredentialStore::get(&db, GEMINI_API_KEY).unwrap(),
            Some("AIza-local".to_string())
        );

        assert!(CredentialStore::remove(&db, GEMINI_API_KEY).unwrap());
        assert!(CredentialStore::get(&db, GEMINI_API_KEY).unwrap().is_none());
    }

    #[test]
    fn test_storage_error_maps_to_storage_kind() {
        let err: ClimateError = StorageError::NotFound("x".into()).into();
        assert!(matches!(err, ClimateError::Storage(_)));
    }

    #[test]
    fn test_report_flow_against_sqlite() {
        let db = Arc::new(Database::in_memory().unwrap());
        let bucket = Arc::new(Bucket::new(
            (*db).clone(),
            "generated-images",
            "http://127.0.0.1:54321",
        ));
        let service = ReportService::new(db.clone(), bucket, NotificationCenter::new());

        let mut draft = ReportForm {
            description: "partial note".into(),
            ..ReportForm::default()
        };
        let draft_id = service.save_draft(&mut draft).unwrap();
        let stored = db.get_report(draft_id).unwrap().unwrap();
        assert_eq!(stored.status, ReportStatus::Draft);
        assert_eq!(stored.location, "Location not specified");
        assert_eq!(stored.reporter_email, "draft@ecovoice.local");

        let mut resumed = service.resume_draft(draft_id).unwrap();
        resumed.location = "River bend".into();
        assert_eq!(service.save_draft(&mut resumed).unwrap(), draft_id);
        let stored = db.get_report(draft_id).unwrap().unwrap();
        assert_eq!(stored.description, "partial note");
        assert_eq!(stored.location, "River bend");

        let mut form = ReportForm {
            violation_type: "air-pollution".into(),
            severity: "high".into(),
            location: "123 Main St".into(),
            incident_date: "2024-03-01".into(),
            description: "Factory smoke".into(),
            reporter_name: "J. Doe".into(),
            reporter_email: "j@example.com".into(),
            ..ReportForm::default()
        };
        service.submit(&mut form).unwrap();

        let submitted = db.list_submitted_reports(10).unwrap();
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].status, ReportStatus::Submitted);
        assert_eq!(submitted[0].image_url, None);
        assert_eq!(db.count_reports(ReportStatus::Draft).unwrap(), 1);
    }
}
