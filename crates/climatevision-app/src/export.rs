//! CSV export of submitted reports.

use std::io::Write;
use std::path::Path;

use chrono::SecondsFormat;
use climatevision_core::reports::Report;
use thiserror::Error;

/// Column headers, in row order.
pub const HEADERS: [&str; 15] = [
    "ID",
    "Created At",
    "Status",
    "Violation Type",
    "Severity",
    "Pollutant",
    "Location",
    "Incident Date",
    "Incident Time",
    "Description",
    "Additional Info",
    "Reporter Name",
    "Reporter Email",
    "Reporter Phone",
    "Image URL",
];

/// Export errors.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Writes reports as CSV to `path`. Returns the number of rows written.
pub fn write_reports_csv(path: impl AsRef<Path>, reports: &[Report]) -> Result<usize, ExportError> {
    let file = std::fs::File::create(path)?;
    write_reports(file, reports)
}

/// Writes reports as CSV to any writer.
pub fn write_reports<W: Write>(writer: W, reports: &[Report]) -> Result<usize, ExportError> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(HEADERS)?;

    for report in reports {
        writer.write_record([
            report.id.to_string(),
            report
                .created_at
                .to_rfc3339_opts(SecondsFormat::Secs, true),
            report.status.as_str().to_string(),
            report.violation_type.clone(),
            report.severity.clone(),
            report.pollutant.clone().unwrap_or_default(),
            report.location.clone(),
            report.incident_date.clone(),
            report.incident_time.clone().unwrap_or_default(),
            report.description.clone(),
            report.additional_info.clone().unwrap_or_default(),
            report.reporter_name.clone(),
            report.reporter_email.clone(),
            report.reporter_phone.clone().unwrap_or_default(),
            report.image_url.clone().unwrap_or_default(),
        ])?;
    }

    writer.flush()?;
    Ok(reports.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use climatevision_core::reports::ReportStatus;

    fn report(id: i64, description: &str) -> Report {
        Report {
            id,
            violation_type: "air-pollution".into(),
            severity: "high".into(),
            pollutant: Some("PM2.5".into()),
            location: "123 Main St".into(),
            incident_date: "2024-03-01".into(),
            incident_time: None,
            description: description.into(),
            additional_info: None,
            reporter_name: "J. Doe".into(),
            reporter_email: "j@example.com".into(),
            reporter_phone: None,
            image_url: Some(
                "http://127.0.0.1:54321/storage/v1/object/public/generated-images/e.png".into(),
            ),
            status: ReportStatus::Submitted,
            created_at: Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap(),
        }
    }

    #[test]
    fn test_export_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports.csv");

        let written = write_reports_csv(&path, &[report(2, "Smoke"), report(1, "Ash")]).unwrap();
        assert_eq!(written, 2);

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.len(), HEADERS.len());
        assert_eq!(&headers[0], "ID");

        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][0], "2");
        assert_eq!(&rows[0][1], "2024-03-01T12:30:00Z");
        assert_eq!(&rows[0][2], "submitted");
        assert_eq!(&rows[1][9], "Ash");
        assert_eq!(&rows[1][8], "");
    }

    #[test]
    fn test_export_quotes_commas_and_newlines() {
        let mut out = Vec::new();
        write_reports(&mut out, &[report(7, "Dumping, at night\nnear the creek")]).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("\"Dumping, at night\nnear the creek\""));
    }

    #[test]
    fn test_export_empty_writes_header_only() {
        let mut out = Vec::new();
        assert_eq!(write_reports(&mut out, &[]).unwrap(), 0);
        assert_eq!(String::from_utf8(out).unwrap().lines().count(), 1);
    }
}
