//! Reports repository.

use chrono::{SecondsFormat, Utc};
use climatevision_core::reports::{NewReport, Report, ReportStatus};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::parse_datetime;
use crate::error::Result;

const REPORT_COLUMNS: &str = "id, violation_type, severity, pollutant, location, incident_date,
     incident_time, description, additional_info, reporter_name, reporter_email,
     reporter_phone, image_url, status, created_at";

/// Repository for report operations.
pub struct ReportsRepo;

impl ReportsRepo {
    /// Insert a report and return its id.
    pub fn insert(conn: &Connection, report: &NewReport) -> Result<i64> {
        conn.execute(
            "INSERT INTO reports (violation_type, severity, pollutant, location, incident_date,
                incident_time, description, additional_info, reporter_name, reporter_email,
                reporter_phone, image_url, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                report.violation_type,
                report.severity,
                report.pollutant,
                report.location,
                report.incident_date,
                report.incident_time,
                report.description,
                report.additional_info,
                report.reporter_name,
                report.reporter_email,
                report.reporter_phone,
                report.image_url,
                report.status.as_str(),
                Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    /// Overwrite a row that is still a draft.
    ///
    /// Submitted rows are never touched. Returns false when no draft with
    /// this id exists.
    pub fn update_draft(conn: &Connection, id: i64, report: &NewReport) -> Result<bool> {
        let updated = conn.execute(
            "UPDATE reports SET violation_type = ?2, severity = ?3, pollutant = ?4,
                location = ?5, incident_date = ?6, incident_time = ?7, description = ?8,
                additional_info = ?9, reporter_name = ?10, reporter_email = ?11,
                reporter_phone = ?12, image_url = ?13, status = ?14, updated_at = ?15
             WHERE id = ?1 AND status = 'draft'",
            params![
                id,
                report.violation_type,
                report.severity,
                report.pollutant,
                report.location,
                report.incident_date,
                report.incident_time,
                report.description,
                report.additional_info,
                report.reporter_name,
                report.reporter_email,
                report.reporter_phone,
                report.image_url,
                report.status.as_str(),
                Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
            ],
        )?;

        Ok(updated > 0)
    }

    /// Get a report by id.
    pub fn get_by_id(conn: &Connection, id: i64) -> Result<Option<Report>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM reports WHERE id = ?1",
            REPORT_COLUMNS
        ))?;

        Ok(stmt.query_row([id], map_report).optional()?)
    }

    /// List reports with a given status, newest first.
    pub fn list_by_status(
        conn: &Connection,
        status: ReportStatus,
        limit: i64,
    ) -> Result<Vec<Report>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM reports WHERE status = ?1
             ORDER BY created_at DESC, id DESC LIMIT ?2",
            REPORT_COLUMNS
        ))?;

        let reports = stmt
            .query_map(params![status.as_str(), limit], map_report)?
            .filter_map(|r| r.ok())
            .collect();

        Ok(reports)
    }

    /// Count reports with a given status.
    pub fn count_by_status(conn: &Connection, status: ReportStatus) -> Result<i64> {
        let count = conn.query_row(
            "SELECT COUNT(*) FROM reports WHERE status = ?1",
            [status.as_str()],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

fn map_report(row: &Row<'_>) -> rusqlite::Result<Report> {
    Ok(Report {
        id: row.get(0)?,
        violation_type: row.get(1)?,
        severity: row.get(2)?,
        pollutant: row.get(3)?,
        location: row.get(4)?,
        incident_date: row.get(5)?,
        incident_time: row.get(6)?,
        description: row.get(7)?,
        additional_info: row.get(8)?,
        reporter_name: row.get(9)?,
        reporter_email: row.get(10)?,
        reporter_phone: row.get(11)?,
        image_url: row.get(12)?,
        status: row
            .get::<_, String>(13)
            .ok()
            .and_then(|s| ReportStatus::parse(&s))
            .unwrap_or(ReportStatus::Draft),
        created_at: parse_datetime(&row.get::<_, String>(14)?),
    })
}
