//! EcoVoice report drafting and submission.
//!
//! A [`ReportForm`] is the single editable state. Two transitions write it:
//!
//! - [`ReportService::save_draft`] needs any one field, fills placeholders
//!   for the rest, and leaves the form intact for further editing.
//! - [`ReportService::submit`] needs every mandatory field and clears the
//!   form on success.
//!
//! Both reject locally, before any storage call, when validation fails.
//! Evidence image uploads are non-fatal in both transitions.

use std::sync::Arc;

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{ClimateError, Result};
use crate::media::{ImageKind, MediaBlob};
use crate::notifications::NotificationCenter;
use crate::store::{unique_object_name, ObjectStore, ReportStore};

/// Accepted violation types.
pub const VIOLATION_TYPES: &[&str] = &[
    "air-pollution",
    "water-pollution",
    "noise-pollution",
    "soil-contamination",
    "illegal-dumping",
    "deforestation",
    "other",
];

/// Accepted severity levels.
pub const SEVERITY_LEVELS: &[&str] = &["low", "medium", "high", "critical"];

const DRAFT_VIOLATION_TYPE: &str = "other";
const DRAFT_SEVERITY: &str = "low";
const DRAFT_LOCATION: &str = "Location not specified";
const DRAFT_DESCRIPTION: &str = "Draft report";
const DRAFT_REPORTER_NAME: &str = "Anonymous";
const DRAFT_REPORTER_EMAIL: &str = "draft@ecovoice.local";

const EVIDENCE_PREFIX: &str = "report-evidence";

/// Persistence state of a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Draft,
    Submitted,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Draft => "draft",
            ReportStatus::Submitted => "submitted",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(ReportStatus::Draft),
            "submitted" => Some(ReportStatus::Submitted),
            _ => None,
        }
    }
}

/// The editable report form. Empty strings mean "not filled in".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportForm {
    pub violation_type: String,
    pub severity: String,
    pub pollutant: String,
    pub location: String,
    pub incident_date: String,
    pub incident_time: String,
    pub description: String,
    pub additional_info: String,
    pub reporter_name: String,
    pub reporter_email: String,
    pub reporter_phone: String,
    /// Evidence photo waiting to be uploaded.
    pub image: Option<MediaBlob>,
    /// Public URL of an already uploaded evidence photo.
    pub image_url: Option<String>,
    /// Row id of the draft this form was last saved as.
    pub draft_id: Option<i64>,
}

impl ReportForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches an evidence photo, replacing any earlier upload.
    pub fn set_image(&mut self, image: MediaBlob) {
        self.image = Some(image);
        self.image_url = None;
    }

    fn text_fields(&self) -> [&str; 11] {
        [
            &self.violation_type,
            &self.severity,
            &self.pollutant,
            &self.location,
            &self.incident_date,
            &self.incident_time,
            &self.description,
            &self.additional_info,
            &self.reporter_name,
            &self.reporter_email,
            &self.reporter_phone,
        ]
    }

    /// True when no field has content and no photo is attached.
    pub fn is_blank(&self) -> bool {
        self.image.is_none()
            && self.image_url.is_none()
            && self.text_fields().iter().all(|f| f.trim().is_empty())
    }

    /// Lists the mandatory fields that are still empty, in form order.
    pub fn missing_required(&self) -> Vec<&'static str> {
        [
            ("violation type", &self.violation_type),
            ("severity", &self.severity),
            ("location", &self.location),
            ("incident date", &self.incident_date),
            ("description", &self.description),
            ("reporter name", &self.reporter_name),
            ("reporter email", &self.reporter_email),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
    }

    /// Reopens a saved draft for editing.
    ///
    /// Synthetic placeholders written by a draft save come back as empty
    /// fields, so submitting still asks for them.
    pub fn from_draft(report: &Report) -> Self {
        let field = |value: &str, placeholder: &str| {
            if value == placeholder {
                String::new()
            } else {
                value.to_string()
            }
        };
        let text = |value: &Option<String>| value.clone().unwrap_or_default();

        Self {
            violation_type: report.violation_type.clone(),
            severity: report.severity.clone(),
            pollutant: text(&report.pollutant),
            location: field(&report.location, DRAFT_LOCATION),
            incident_date: report.incident_date.clone(),
            incident_time: text(&report.incident_time),
            description: field(&report.description, DRAFT_DESCRIPTION),
            additional_info: text(&report.additional_info),
            reporter_name: field(&report.reporter_name, DRAFT_REPORTER_NAME),
            reporter_email: field(&report.reporter_email, DRAFT_REPORTER_EMAIL),
            reporter_phone: text(&report.reporter_phone),
            image: None,
            image_url: report.image_url.clone(),
            draft_id: Some(report.id),
        }
    }

    /// Resets every field, the photo, and the remembered draft.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    fn to_new_report(&self, status: ReportStatus) -> NewReport {
        let placeholder = |value: &str, default: &str| -> String {
            let value = value.trim();
            if value.is_empty() && status == ReportStatus::Draft {
                default.to_string()
            } else {
                value.to_string()
            }
        };

        let today = Local::now().date_naive().format("%Y-%m-%d").to_string();

        NewReport {
            violation_type: placeholder(&self.violation_type, DRAFT_VIOLATION_TYPE),
            severity: placeholder(&self.severity, DRAFT_SEVERITY),
            pollutant: optional(&self.pollutant),
            location: placeholder(&self.location, DRAFT_LOCATION),
            incident_date: placeholder(&self.incident_date, &today),
            incident_time: optional(&self.incident_time),
            description: placeholder(&self.description, DRAFT_DESCRIPTION),
            additional_info: optional(&self.additional_info),
            reporter_name: placeholder(&self.reporter_name, DRAFT_REPORTER_NAME),
            reporter_email: placeholder(&self.reporter_email, DRAFT_REPORTER_EMAIL),
            reporter_phone: optional(&self.reporter_phone),
            image_url: self.image_url.clone(),
            status,
        }
    }
}

fn optional(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// A report row about to be written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewReport {
    pub violation_type: String,
    pub severity: String,
    pub pollutant: Option<String>,
    pub location: String,
    pub incident_date: String,
    pub incident_time: Option<String>,
    pub description: String,
    pub additional_info: Option<String>,
    pub reporter_name: String,
    pub reporter_email: String,
    pub reporter_phone: Option<String>,
    pub image_url: Option<String>,
    pub status: ReportStatus,
}

/// A persisted report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub id: i64,
    pub violation_type: String,
    pub severity: String,
    pub pollutant: Option<String>,
    pub location: String,
    pub incident_date: String,
    pub incident_time: Option<String>,
    pub description: String,
    pub additional_info: Option<String>,
    pub reporter_name: String,
    pub reporter_email: String,
    pub reporter_phone: Option<String>,
    pub image_url: Option<String>,
    pub status: ReportStatus,
    pub created_at: DateTime<Utc>,
}

/// Drives the draft and submit transitions.
pub struct ReportService {
    reports: Arc<dyn ReportStore>,
    evidence: Arc<dyn ObjectStore>,
    notifications: NotificationCenter,
}

impl ReportService {
    pub fn new(
        reports: Arc<dyn ReportStore>,
        evidence: Arc<dyn ObjectStore>,
        notifications: NotificationCenter,
    ) -> Self {
        Self {
            reports,
            evidence,
            notifications,
        }
    }

    /// Saves the form as a draft and returns the row id.
    ///
    /// The form keeps its contents and remembers the id, so a later save
    /// updates the same row.
    pub fn save_draft(&self, form: &mut ReportForm) -> Result<i64> {
        if form.is_blank() {
            let err = ClimateError::Validation(
                "Please fill in at least one field before saving a draft".to_string(),
            );
            self.notifications.report(&err);
            return Err(err);
        }

        let uploaded = self.upload_evidence(form);
        let report = form.to_new_report(ReportStatus::Draft);

        match self.write(form.draft_id, &report) {
            Ok(id) => {
                form.draft_id = Some(id);
                info!(id, "Report draft saved");
                self.warn_if_not_uploaded(uploaded);
                self.notifications
                    .success("Draft saved. You can keep editing and submit later.");
                Ok(id)
            }
            Err(err) => {
                self.notifications.report(&err);
                Err(err)
            }
        }
    }

    /// Submits the form and returns the row id. Clears the form on success.
    pub fn submit(&self, form: &mut ReportForm) -> Result<i64> {
        let missing = form.missing_required();
        if !missing.is_empty() {
            let err = ClimateError::Validation(format!(
                "Please fill out all required fields: {}",
                missing.join(", ")
            ));
            self.notifications.report(&err);
            return Err(err);
        }

        let uploaded = self.upload_evidence(form);
        let report = form.to_new_report(ReportStatus::Submitted);

        match self.write(form.draft_id, &report) {
            Ok(id) => {
                info!(id, violation_type = %report.violation_type, "Report submitted");
                self.warn_if_not_uploaded(uploaded);
                form.clear();
                self.notifications.success(
                    "Report submitted. Your environmental report has been forwarded to relevant authorities.",
                );
                Ok(id)
            }
            Err(err) => {
                self.notifications.report(&err);
                Err(err)
            }
        }
    }

    /// Loads a saved draft back into a form. Submitted reports are final.
    pub fn resume_draft(&self, id: i64) -> Result<ReportForm> {
        let report = self
            .reports
            .get_report(id)?
            .ok_or_else(|| ClimateError::Validation(format!("Draft #{} was not found", id)))?;

        if report.status != ReportStatus::Draft {
            return Err(ClimateError::Validation(format!(
                "Report #{} was already submitted and can no longer be edited",
                id
            )));
        }

        debug!(id, "Resuming draft");
        Ok(ReportForm::from_draft(&report))
    }

    /// Lists submitted reports, newest first.
    pub fn submitted_reports(&self, limit: i64) -> Result<Vec<Report>> {
        self.reports.list_submitted(limit).inspect_err(|_| {
            self.notifications.error("Failed to load reports");
        })
    }

    /// Updates the remembered draft when it still exists, else inserts.
    fn write(&self, draft_id: Option<i64>, report: &NewReport) -> Result<i64> {
        if let Some(id) = draft_id {
            if self.reports.update_draft(id, report)? {
                return Ok(id);
            }
            debug!(id, "Remembered draft is gone, inserting a new row");
        }
        self.reports.insert_report(report)
    }

    fn warn_if_not_uploaded(&self, uploaded: bool) {
        if !uploaded {
            self.notifications
                .warning("Image upload failed. The report was saved without the image.");
        }
    }

    /// Uploads a pending photo. Returns false only when an upload was
    /// attempted and failed.
    fn upload_evidence(&self, form: &mut ReportForm) -> bool {
        if form.image_url.is_some() {
            return true;
        }
        let Some(image) = form.image.as_ref() else {
            return true;
        };

        let extension = image
            .image_kind()
            .map(|k| k.extension())
            .unwrap_or(ImageKind::Png.extension());
        let name = unique_object_name(EVIDENCE_PREFIX, extension);

        let uploaded = self
            .evidence
            .put_object(&name, &image.bytes, &image.mime)
            .and_then(|stored| {
                debug!(object_name = %stored.name, size = stored.size, "Evidence uploaded");
                self.evidence.public_url(&stored.name)
            });

        match uploaded {
            Ok(url) => {
                form.image_url = Some(url);
                true
            }
            Err(e) => {
                warn!(object_name = %name, "Evidence upload failed: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::media::fixtures::png_blob;
    use crate::notifications::NotificationKind;
    use crate::store::StoredObject;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Report store fake that records every write.
    #[derive(Default)]
    pub(crate) struct CountingReports {
        pub rows: Mutex<Vec<(i64, NewReport)>>,
        pub inserts: AtomicUsize,
        pub updates: AtomicUsize,
        pub fail_writes: bool,
    }

    fn to_report(id: i64, r: &NewReport) -> Report {
        Report {
            id,
            violation_type: r.violation_type.clone(),
            severity: r.severity.clone(),
            pollutant: r.pollutant.clone(),
            location: r.location.clone(),
            incident_date: r.incident_date.clone(),
            incident_time: r.incident_time.clone(),
            description: r.description.clone(),
            additional_info: r.additional_info.clone(),
            reporter_name: r.reporter_name.clone(),
            reporter_email: r.reporter_email.clone(),
            reporter_phone: r.reporter_phone.clone(),
            image_url: r.image_url.clone(),
            status: r.status,
            created_at: Utc::now(),
        }
    }

    impl ReportStore for CountingReports {
        fn insert_report(&self, report: &NewReport) -> Result<i64> {
            self.inserts.fetch_add(1, Ordering::SeqCst);
            if self.fail_writes {
                return Err(ClimateError::Storage("database is locked".into()));
            }
            let mut rows = self.rows.lock().unwrap();
            let id = rows.len() as i64 + 1;
            rows.push((id, report.clone()));
            Ok(id)
        }

        fn update_draft(&self, id: i64, report: &NewReport) -> Result<bool> {
            self.updates.fetch_add(1, Ordering::SeqCst);
            let mut rows = self.rows.lock().unwrap();
            match rows
                .iter_mut()
                .find(|(row_id, r)| *row_id == id && r.status == ReportStatus::Draft)
            {
                Some(row) => {
                    row.1 = report.clone();
                    Ok(true)
                }
                None => Ok(false),
            }
        }

        fn get_report(&self, id: i64) -> Result<Option<Report>> {
            let rows = self.rows.lock().unwrap();
            Ok(rows
                .iter()
                .find(|(row_id, _)| *row_id == id)
                .map(|(id, r)| to_report(*id, r)))
        }

        fn list_submitted(&self, limit: i64) -> Result<Vec<Report>> {
            let rows = self.rows.lock().unwrap();
            Ok(rows
                .iter()
                .rev()
                .filter(|(_, r)| r.status == ReportStatus::Submitted)
                .take(limit as usize)
                .map(|(id, r)| to_report(*id, r))
                .collect())
        }
    }

    /// Object store fake that can be told to fail.
    #[derive(Default)]
    pub(crate) struct FakeBucket {
        pub fail: bool,
        pub puts: AtomicUsize,
    }

    impl ObjectStore for FakeBucket {
        fn put_object(&self, name: &str, bytes: &[u8], content_type: &str) -> Result<StoredObject> {
            self.puts.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ClimateError::Storage("bucket unavailable".into()));
            }
            Ok(StoredObject {
                bucket: "generated-images".into(),
                name: name.to_string(),
                content_type: content_type.to_string(),
                size: bytes.len() as u64,
                checksum: String::new(),
            })
        }

        fn public_url(&self, name: &str) -> Result<String> {
            Ok(format!(
                "http://localhost/storage/v1/object/public/generated-images/{}",
                name
            ))
        }
    }

    fn service(
        bucket: FakeBucket,
    ) -> (ReportService, Arc<CountingReports>, Arc<FakeBucket>, NotificationCenter) {
        service_with(CountingReports::default(), bucket)
    }

    fn service_with(
        reports: CountingReports,
        bucket: FakeBucket,
    ) -> (ReportService, Arc<CountingReports>, Arc<FakeBucket>, NotificationCenter) {
        let reports = Arc::new(reports);
        let bucket = Arc::new(bucket);
        let notifications = NotificationCenter::new();
        (
            ReportService::new(reports.clone(), bucket.clone(), notifications.clone()),
            reports,
            bucket,
            notifications,
        )
    }

    fn complete_form() -> ReportForm {
        ReportForm {
            violation_type: "air-pollution".into(),
            severity: "high".into(),
            location: "123 Main St".into(),
            incident_date: "2024-03-01".into(),
            description: "Factory smoke".into(),
            reporter_name: "J. Doe".into(),
            reporter_email: "j@example.com".into(),
            ..ReportForm::default()
        }
    }

    #[test]
    fn submit_complete_form_without_image() {
        let (service, reports, bucket, notifications) = service(FakeBucket::default());
        let mut form = complete_form();

        service.submit(&mut form).unwrap();

        let rows = reports.rows.lock().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].1.status, ReportStatus::Submitted);
        assert_eq!(rows[0].1.image_url, None);
        assert_eq!(rows[0].1.location, "123 Main St");
        assert_eq!(bucket.puts.load(Ordering::SeqCst), 0);
        assert_eq!(form, ReportForm::default());
        assert_eq!(notifications.latest().unwrap().kind, NotificationKind::Success);
    }

    #[test]
    fn draft_with_only_description_gets_placeholders() {
        let (service, reports, _, _) = service(FakeBucket::default());
        let mut form = ReportForm {
            description: "partial note".into(),
            ..ReportForm::default()
        };

        let id = service.save_draft(&mut form).unwrap();

        let rows = reports.rows.lock().unwrap();
        assert_eq!(rows.len(), 1);
        let row = &rows[0].1;
        assert_eq!(row.status, ReportStatus::Draft);
        assert_eq!(row.description, "partial note");
        assert_eq!(row.location, "Location not specified");
        assert_eq!(row.reporter_email, "draft@ecovoice.local");
        assert_eq!(row.reporter_name, "Anonymous");
        assert_eq!(row.violation_type, "other");
        assert_eq!(row.incident_date.len(), 10);

        // The form is kept for further editing.
        assert_eq!(form.description, "partial note");
        assert_eq!(form.draft_id, Some(id));
    }

    #[test]
    fn submit_missing_fields_never_writes() {
        let (service, reports, bucket, notifications) = service(FakeBucket::default());
        let mut form = complete_form();
        form.location.clear();
        form.reporter_email = "   ".into();
        form.set_image(png_blob());

        let err = service.submit(&mut form).unwrap_err();

        assert!(matches!(err, ClimateError::Validation(_)));
        assert!(err.to_string().contains("location"));
        assert!(err.to_string().contains("reporter email"));
        assert_eq!(reports.inserts.load(Ordering::SeqCst), 0);
        assert_eq!(reports.updates.load(Ordering::SeqCst), 0);
        assert_eq!(bucket.puts.load(Ordering::SeqCst), 0);
        assert_eq!(notifications.latest().unwrap().kind, NotificationKind::Error);
        assert_eq!(form.description, "Factory smoke");
    }

    #[test]
    fn blank_draft_never_writes() {
        let (service, reports, _, _) = service(FakeBucket::default());
        let mut form = ReportForm {
            description: "   ".into(),
            ..ReportForm::default()
        };
        assert!(service.save_draft(&mut form).is_err());
        assert_eq!(reports.inserts.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn draft_upload_failure_is_a_warning() {
        let (service, reports, _, notifications) = service(FakeBucket {
            fail: true,
            ..FakeBucket::default()
        });
        let mut form = ReportForm {
            location: "Riverbank".into(),
            ..ReportForm::default()
        };
        form.set_image(png_blob());

        service.save_draft(&mut form).unwrap();

        let rows = reports.rows.lock().unwrap();
        assert_eq!(rows[0].1.image_url, None);
        let kinds: Vec<_> = notifications.list().iter().map(|n| n.kind).collect();
        assert_eq!(kinds, vec![NotificationKind::Success, NotificationKind::Warning]);
    }

    #[test]
    fn uploaded_image_url_is_stored() {
        let (service, reports, bucket, _) = service(FakeBucket::default());
        let mut form = complete_form();
        form.set_image(png_blob());

        service.submit(&mut form).unwrap();

        let rows = reports.rows.lock().unwrap();
        let url = rows[0].1.image_url.as_deref().unwrap();
        assert!(url.contains("/storage/v1/object/public/generated-images/report-evidence-"));
        assert!(url.ends_with(".png"));
        assert_eq!(bucket.puts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn repeated_draft_saves_update_in_place() {
        let (service, reports, bucket, _) = service(FakeBucket::default());
        let mut form = ReportForm {
            description: "first".into(),
            ..ReportForm::default()
        };
        form.set_image(png_blob());

        let first = service.save_draft(&mut form).unwrap();
        form.description = "second".into();
        let second = service.save_draft(&mut form).unwrap();

        assert_eq!(first, second);
        assert_eq!(reports.inserts.load(Ordering::SeqCst), 1);
        assert_eq!(reports.rows.lock().unwrap()[0].1.description, "second");
        // The photo is uploaded once.
        assert_eq!(bucket.puts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn submit_promotes_saved_draft() {
        let (service, reports, _, _) = service(FakeBucket::default());
        let mut form = ReportForm {
            description: "Factory smoke".into(),
            ..ReportForm::default()
        };
        let draft = service.save_draft(&mut form).unwrap();

        let mut completed = complete_form();
        completed.draft_id = form.draft_id;
        let submitted = service.submit(&mut completed).unwrap();

        assert_eq!(draft, submitted);
        assert_eq!(reports.inserts.load(Ordering::SeqCst), 1);
        assert_eq!(service.submitted_reports(10).unwrap().len(), 1);
    }

    #[test]
    fn failed_write_never_claims_the_report_was_saved() {
        let reports = CountingReports {
            fail_writes: true,
            ..CountingReports::default()
        };
        let (service, _, bucket, notifications) = service_with(
            reports,
            FakeBucket {
                fail: true,
                ..FakeBucket::default()
            },
        );
        let mut form = complete_form();
        form.set_image(png_blob());

        let err = service.submit(&mut form).unwrap_err();

        assert!(matches!(err, ClimateError::Storage(_)));
        assert_eq!(bucket.puts.load(Ordering::SeqCst), 1);
        let kinds: Vec<_> = notifications.list().iter().map(|n| n.kind).collect();
        assert_eq!(kinds, vec![NotificationKind::Error]);
        assert_eq!(form.location, "123 Main St");
    }

    #[test]
    fn resumed_draft_keeps_saved_fields() {
        let (service, reports, _, _) = service(FakeBucket::default());
        let mut form = ReportForm {
            description: "partial note".into(),
            ..ReportForm::default()
        };
        let id = service.save_draft(&mut form).unwrap();

        let mut resumed = service.resume_draft(id).unwrap();
        assert_eq!(resumed.description, "partial note");
        assert_eq!(resumed.draft_id, Some(id));
        // Placeholders are not carried back as real input.
        assert!(resumed.location.is_empty());
        assert!(resumed.reporter_email.is_empty());

        resumed.location = "River bend".into();
        service.save_draft(&mut resumed).unwrap();

        let rows = reports.rows.lock().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].1.description, "partial note");
        assert_eq!(rows[0].1.location, "River bend");
    }

    #[test]
    fn submitted_report_cannot_be_resumed() {
        let (service, _, _, _) = service(FakeBucket::default());
        let id = service.submit(&mut complete_form()).unwrap();

        let err = service.resume_draft(id).unwrap_err();
        assert!(matches!(err, ClimateError::Validation(_)));
        assert!(err.to_string().contains("already submitted"));

        assert!(matches!(
            service.resume_draft(99).unwrap_err(),
            ClimateError::Validation(_)
        ));
    }

    #[test]
    fn status_parsing() {
        assert_eq!(ReportStatus::parse("draft"), Some(ReportStatus::Draft));
        assert_eq!(ReportStatus::Submitted.as_str(), "submitted");
        assert!(ReportStatus::parse("archived").is_none());
    }
}
