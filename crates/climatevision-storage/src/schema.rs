//! Database schema and migrations.

use rusqlite::Connection;
use tracing::info;

use crate::error::Result;

/// Current schema version.
pub const SCHEMA_VERSION: i32 = 2;

type Migration = fn(&Connection) -> Result<()>;

/// Migrations in order; entry `i` brings the schema to version `i + 1`.
const MIGRATIONS: [Migration; SCHEMA_VERSION as usize] = [migrate_v1, migrate_v2];

/// Applies every migration newer than the stored version.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER PRIMARY KEY)")?;

    let current = get_schema_version(conn)?;
    if current >= SCHEMA_VERSION {
        return Ok(());
    }
    info!(from = current, to = SCHEMA_VERSION, "Running migrations");

    for (idx, migrate) in MIGRATIONS.iter().enumerate().skip(current.max(0) as usize) {
        migrate(conn)?;
        set_schema_version(conn, idx as i32 + 1)?;
    }

    info!("Migrations complete");
    Ok(())
}

fn get_schema_version(conn: &Connection) -> Result<i32> {
    let version = conn
        .query_row("SELECT MAX(version) FROM schema_version", [], |row| {
            row.get::<_, Option<i32>>(0)
        })?;
    Ok(version.unwrap_or(0))
}

fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute_batch("DELETE FROM schema_version")?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    Ok(())
}

/// Migration to version 1: reports and configuration.
fn migrate_v1(conn: &Connection) -> Result<()> {
    info!("Applying migration v1: reports and config");

    conn.execute(
        "CREATE TABLE IF NOT EXISTS reports (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            violation_type TEXT NOT NULL,
            severity TEXT NOT NULL,
            pollutant TEXT,
            location TEXT NOT NULL,
            incident_date TEXT NOT NULL,
            incident_time TEXT,
            description TEXT NOT NULL,
            additional_info TEXT,
            reporter_name TEXT NOT NULL,
            reporter_email TEXT NOT NULL,
            reporter_phone TEXT,
            image_url TEXT,
            status TEXT NOT NULL CHECK (status IN ('draft', 'submitted')),
            created_at TEXT NOT NULL,
            updated_at TEXT
        )",
        [],
    )?;

    // Listing reads submitted rows newest first
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_reports_status_created
         ON reports (status, created_at)",
        [],
    )?;

    // Key-value configuration; values are JSON
    conn.execute(
        "CREATE TABLE IF NOT EXISTS config (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )",
        [],
    )?;

    Ok(())
}

/// Migration to version 2: object bucket.
fn migrate_v2(conn: &Connection) -> Result<()> {
    info!("Applying migration v2: objects");

    conn.execute(
        "CREATE TABLE IF NOT EXISTS objects (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            bucket TEXT NOT NULL,
            name TEXT NOT NULL,
            content_type TEXT NOT NULL,
            size INTEGER NOT NULL,
            sha256 TEXT NOT NULL,
            bytes BLOB NOT NULL,
            created_at TEXT NOT NULL,
            UNIQUE (bucket, name)
        )",
        [],
    )?;

    Ok(())
}
