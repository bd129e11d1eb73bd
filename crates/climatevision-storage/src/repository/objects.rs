//! Objects repository: the append-only bucket table.

use chrono::{SecondsFormat, Utc};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use sha2::{Digest, Sha256};

use super::parse_datetime;
use crate::error::{Result, StorageError};
use crate::models::ObjectRecord;

/// Hex-encoded SHA-256 of `bytes`.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Repository for object operations.
pub struct ObjectsRepo;

impl ObjectsRepo {
    /// Write a new object. Fails with `ObjectExists` if the name is taken.
    pub fn insert(
        conn: &Connection,
        bucket: &str,
        name: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<ObjectRecord> {
        let sha256 = sha256_hex(bytes);
        let created_at = Utc::now();

        let result = conn.execute(
            "INSERT INTO objects (bucket, name, content_type, size, sha256, bytes, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                bucket,
                name,
                content_type,
                bytes.len() as i64,
                sha256,
                bytes,
                created_at.to_rfc3339_opts(SecondsFormat::Micros, true),
            ],
        );

        match result {
            Ok(_) => Ok(ObjectRecord {
                bucket: bucket.to_string(),
                name: name.to_string(),
                content_type: content_type.to_string(),
                size: bytes.len() as u64,
                sha256,
                bytes: bytes.to_vec(),
                created_at,
            }),
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == ErrorCode::ConstraintViolation =>
            {
                Err(StorageError::ObjectExists {
                    bucket: bucket.to_string(),
                    name: name.to_string(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Read an object, including its bytes.
    pub fn get(conn: &Connection, bucket: &str, name: &str) -> Result<Option<ObjectRecord>> {
        let mut stmt = conn.prepare(
            "SELECT bucket, name, content_type, size, sha256, bytes, created_at
             FROM objects WHERE bucket = ?1 AND name = ?2",
        )?;

        let record = stmt
            .query_row(params![bucket, name], |row| {
                Ok(ObjectRecord {
                    bucket: row.get(0)?,
                    name: row.get(1)?,
                    content_type: row.get(2)?,
                    size: row.get::<_, i64>(3)? as u64,
                    sha256: row.get(4)?,
                    bytes: row.get(5)?,
                    created_at: parse_datetime(&row.get::<_, String>(6)?),
                })
            })
            .optional()?;

        Ok(record)
    }

    /// Count the objects in a bucket.
    pub fn count(conn: &Connection, bucket: &str) -> Result<i64> {
        let count = conn.query_row(
            "SELECT COUNT(*) FROM objects WHERE bucket = ?1",
            [bucket],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
