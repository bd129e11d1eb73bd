//! Key-value configuration. Values are stored as JSON text.

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde_json::Value;

use crate::error::Result;
use crate::models::ConfigEntry;

/// Repository for the `config` table.
pub struct ConfigRepo;

/// Undecodable JSON reads as `Null` rather than failing the whole query.
fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<ConfigEntry> {
    let raw: String = row.get(1)?;
    Ok(ConfigEntry {
        key: row.get(0)?,
        value: serde_json::from_str(&raw).unwrap_or(Value::Null),
    })
}

impl ConfigRepo {
    pub fn get(conn: &Connection, key: &str) -> Result<Option<ConfigEntry>> {
        Ok(conn
            .query_row(
                "SELECT key, value FROM config WHERE key = ?1",
                [key],
                entry_from_row,
            )
            .optional()?)
    }

    /// Inserts or replaces a value.
    pub fn set(conn: &Connection, key: &str, value: &Value) -> Result<()> {
        conn.execute(
            "INSERT INTO config (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, serde_json::to_string(value)?],
        )?;
        Ok(())
    }

    /// Returns false if the key was not set.
    pub fn delete(conn: &Connection, key: &str) -> Result<bool> {
        Ok(conn.execute("DELETE FROM config WHERE key = ?1", [key])? > 0)
    }

    /// All entries, ordered by key.
    pub fn get_all(conn: &Connection) -> Result<Vec<ConfigEntry>> {
        let mut stmt = conn.prepare("SELECT key, value FROM config ORDER BY key")?;
        let entries = stmt
            .query_map([], entry_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entries)
    }

    /// A string value. Non-string JSON counts as unset.
    pub fn get_string(conn: &Connection, key: &str) -> Result<Option<String>> {
        Ok(match Self::get(conn, key)? {
            Some(ConfigEntry {
                value: Value::String(s),
                ..
            }) => Some(s),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::run_migrations;
    use serde_json::json;

    fn setup_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        conn
    }

    #[test]
    fn test_set_overwrites() {
        let conn = setup_db();

        ConfigRepo::set(&conn, "fal_api_key", &json!("fal-key-1")).unwrap();
        ConfigRepo::set(&conn, "fal_api_key", &json!("fal-key-2")).unwrap();

        let entry = ConfigRepo::get(&conn, "fal_api_key").unwrap().unwrap();
        assert_eq!(entry.value, json!("fal-key-2"));
        assert_eq!(ConfigRepo::get_all(&conn).unwrap().len(), 1);
    }

    #[test]
    fn test_delete_reports_presence() {
        let conn = setup_db();

        ConfigRepo::set(&conn, "gemini_api_key", &json!("value")).unwrap();
        assert!(ConfigRepo::delete(&conn, "gemini_api_key").unwrap());
        assert!(!ConfigRepo::delete(&conn, "gemini_api_key").unwrap());
        assert!(ConfigRepo::get(&conn, "gemini_api_key").unwrap().is_none());
    }

    #[test]
    fn test_get_string_ignores_non_strings() {
        let conn = setup_db();

        ConfigRepo::set(&conn, "gemini_api_key", &json!("AIza-test")).unwrap();
        ConfigRepo::set(&conn, "numeric", &json!(7)).unwrap();

        assert_eq!(
            ConfigRepo::get_string(&conn, "gemini_api_key").unwrap(),
            Some("AIza-test".to_string())
        );
        assert_eq!(ConfigRepo::get_string(&conn, "numeric").unwrap(), None);
        assert_eq!(ConfigRepo::get_string(&conn, "missing").unwrap(), None);
    }

    #[test]
    fn test_corrupt_value_reads_as_null() {
        let conn = setup_db();
        conn.execute("INSERT INTO config (key, value) VALUES ('bad', '{oops')", [])
            .unwrap();

        let entry = ConfigRepo::get(&conn, "bad").unwrap().unwrap();
        assert_eq!(entry.value, Value::Null);
    }

    #[test]
    fn test_get_all_sorted() {
        let conn = setup_db();

        for key in ["b", "c", "a"] {
            ConfigRepo::set(&conn, key, &json!(key)).unwrap();
        }

        let keys: Vec<String> = ConfigRepo::get_all(&conn)
            .unwrap()
            .into_iter()
            .map(|e| e.key)
            .collect();
        assert_eq!(keys, ["a", "b", "c"]);
    }
}
