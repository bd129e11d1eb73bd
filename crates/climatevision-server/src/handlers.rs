//! API route handlers for objects, reports, and health.

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use climatevision_core::reports::{NewReport, ReportStatus};
use tracing::{debug, info};

use crate::error::{ApiError, Result};
use crate::models::{
    CreateReportResponse, HealthResponse, ObjectUploadResponse, ReportsQuery, ReportsResponse,
};
use crate::state::AppState;

/// Largest accepted report listing.
const MAX_REPORTS_LIMIT: i64 = 500;

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        relay_configured: state.video_provider.is_some(),
    })
}

/// POST /storage/v1/object/{bucket}/{name} - Store a new object.
pub async fn upload_object(
    State(state): State<AppState>,
    Path((bucket, name)): Path<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<ObjectUploadResponse>)> {
    if body.is_empty() {
        return Err(ApiError::BadRequest("object body is empty".to_string()));
    }

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream");

    let record = state.db.put_object(&bucket, &name, content_type, &body)?;
    info!(bucket = %bucket, object_name = %name, size = record.size, "Object uploaded");

    Ok((
        StatusCode::CREATED,
        Json(ObjectUploadResponse {
            key: format!("{}/{}", record.bucket, record.name),
            public_url: state.public_url(&record.bucket, &record.name),
            size: record.size,
            sha256: record.sha256,
        }),
    ))
}

/// GET /storage/v1/object/public/{bucket}/{name} - Serve stored bytes.
pub async fn get_public_object(
    State(state): State<AppState>,
    Path((bucket, name)): Path<(String, String)>,
) -> Result<Response> {
    let record = state
        .db
        .get_object(&bucket, &name)?
        .ok_or_else(|| ApiError::NotFound(format!("{}/{}", bucket, name)))?;

    debug!(bucket = %bucket, object_name = %name, "Serving object");

    Ok((
        [
            (header::CONTENT_TYPE, record.content_type),
            (header::ETAG, format!("\"{}\"", record.sha256)),
        ],
        record.bytes,
    )
        .into_response())
}

/// POST /rest/v1/reports - Insert a report row.
pub async fn create_report(
    State(state): State<AppState>,
    Json(report): Json<NewReport>,
) -> Result<(StatusCode, Json<CreateReportResponse>)> {
    if report.status == ReportStatus::Submitted {
        let missing: Vec<&str> = [
            ("violation_type", &report.violation_type),
            ("severity", &report.severity),
            ("location", &report.location),
            ("incident_date", &report.incident_date),
            ("description", &report.description),
            ("reporter_name", &report.reporter_name),
            ("reporter_email", &report.reporter_email),
        ]
        .into_iter()
        .filter(|(_, v)| v.trim().is_empty())
        .map(|(name, _)| name)
        .collect();

        if !missing.is_empty() {
            return Err(ApiError::BadRequest(format!(
                "missing required fields: {}",
                missing.join(", ")
            )));
        }
    }

    let id = state.db.insert_report(&report)?;
    Ok((StatusCode::CREATED, Json(CreateReportResponse { id })))
}

/// GET /rest/v1/reports - List submitted reports, newest first.
pub async fn list_reports(
    State(state): State<AppState>,
    Query(query): Query<ReportsQuery>,
) -> Result<Json<ReportsResponse>> {
    let limit = query.limit.clamp(1, MAX_REPORTS_LIMIT);
    let reports = state.db.list_submitted_reports(limit)?;
    let total = reports.len();
    Ok(Json(ReportsResponse { reports, total }))
}
