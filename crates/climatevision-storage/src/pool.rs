//! Shared SQLite connection.
//!
//! One connection behind a mutex. Handlers and CLI commands hold it for a
//! single statement or short transaction.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use rusqlite::Connection;
use tracing::debug;

use crate::error::{Result, StorageError};
use crate::schema::run_migrations;

/// How long a writer waits on a locked database file.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const PRAGMAS: &str = "
    PRAGMA foreign_keys = ON;
    PRAGMA journal_mode = WAL;
    PRAGMA synchronous = NORMAL;
    PRAGMA cache_size = -8000;
";

/// Cloneable handle to the migrated connection.
#[derive(Clone)]
pub struct ConnectionPool {
    conn: Arc<Mutex<Connection>>,
}

impl ConnectionPool {
    /// Opens (or creates) a database file.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref())?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Self::prepare(conn)
    }

    pub fn in_memory() -> Result<Self> {
        Self::prepare(Connection::open_in_memory()?)
    }

    fn prepare(conn: Connection) -> Result<Self> {
        conn.execute_batch(PRAGMAS)?;
        run_migrations(&conn)?;
        debug!("Database connection ready");

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Locks the connection for the caller's scope.
    pub fn get(&self) -> Result<PooledConnection<'_>> {
        self.conn
            .lock()
            .map(|guard| PooledConnection { guard })
            .map_err(|_| StorageError::Config("Connection lock poisoned".to_string()))
    }
}

/// The locked connection.
pub struct PooledConnection<'a> {
    guard: MutexGuard<'a, Connection>,
}

impl std::ops::Deref for PooledConnection<'_> {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        &self.guard
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_is_migrated() {
        let pool = ConnectionPool::in_memory().unwrap();
        let conn = pool.get().unwrap();

        let reports: i64 = conn
            .query_row("SELECT COUNT(*) FROM reports", [], |row| row.get(0))
            .unwrap();
        let objects: i64 = conn
            .query_row("SELECT COUNT(*) FROM objects", [], |row| row.get(0))
            .unwrap();
        assert_eq!((reports, objects), (0, 0));
    }

    #[test]
    fn test_clones_share_one_database() {
        let pool = ConnectionPool::in_memory().unwrap();
        let other = pool.clone();

        pool.get()
            .unwrap()
            .execute("INSERT INTO config (key, value) VALUES ('k', '1')", [])
            .unwrap();

        let count: i64 = other
            .get()
            .unwrap()
            .query_row("SELECT COUNT(*) FROM config", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_file_database_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("climatevision.db");

        {
            let pool = ConnectionPool::new(&path).unwrap();
            pool.get()
                .unwrap()
                .execute("INSERT INTO config (key, value) VALUES ('k', '\"v\"')", [])
                .unwrap();
        }

        let pool = ConnectionPool::new(&path).unwrap();
        let value: String = pool
            .get()
            .unwrap()
            .query_row("SELECT value FROM config WHERE key = 'k'", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(value, "\"v\"");
    }
}
