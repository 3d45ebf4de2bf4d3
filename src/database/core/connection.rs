//! Database connection management
//!
//! This module provides the SQLite connection wrapper used throughout waybill,
//! and the [`ConnectionProvider`] capability every storage access goes through.

use anyhow::{anyhow, Result};
use rusqlite::{Connection, OpenFlags};
use std::path::{Path, PathBuf};

/// Core database connection wrapper
///
/// `DatabaseConn` provides a thin wrapper around SQLite connections,
/// handling both file-based and in-memory databases with consistent
/// configuration and error handling. The connection is closed when the
/// wrapper is dropped.
pub struct DatabaseConn {
    pub conn: Connection,
}

impl DatabaseConn {
    /// Open a database at the specified path
    ///
    /// If the path is `None`, an in-memory database is created.
    pub fn open(path: Option<&str>) -> Result<Self> {
        let conn = match path {
            Some(p) => Connection::open(p)
                .map_err(|e| anyhow!("Failed to open database at '{}': {}", p, e))?,
            None => Connection::open_in_memory()
                .map_err(|e| anyhow!("Failed to create in-memory database: {}", e))?,
        };

        let db = DatabaseConn { conn };
        db.configure()?;
        Ok(db)
    }

    /// Open a database at the specified path (convenience method)
    pub fn open_path(path: &str) -> Result<Self> {
        Self::open(Some(path))
    }

    /// Open an existing database file; fails instead of creating a new one
    pub fn open_existing(path: &str) -> Result<Self> {
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(path, flags)
            .map_err(|e| anyhow!("Failed to open database at '{}': {}", path, e))?;

        let db = DatabaseConn { conn };
        db.configure()?;
        Ok(db)
    }

    /// Create an in-memory database
    pub fn open_in_memory() -> Result<Self> {
        Self::open(None)
    }

    /// Per-connection settings applied on every open
    fn configure(&self) -> Result<()> {
        // SQLite ships with foreign key enforcement off
        self.conn
            .execute("PRAGMA foreign_keys=ON", [])
            .map_err(|e| anyhow!("Failed to enable foreign keys: {}", e))?;

        // Store temp tables in memory
        self.conn
            .execute("PRAGMA temp_store=MEMORY", [])
            .map_err(|e| anyhow!("Failed to set temp store: {}", e))?;

        Ok(())
    }

    /// Execute a SQL statement
    pub fn execute(&self, sql: &str) -> Result<usize> {
        self.conn
            .execute(sql, [])
            .map_err(|e| anyhow!("Failed to execute SQL: {}", e))
    }

    /// Execute a SQL script verbatim
    ///
    /// The script may hold any number of statements and comments; nothing is
    /// split or stripped before it reaches SQLite.
    pub fn execute_script(&self, sql: &str) -> Result<()> {
        self.conn
            .execute_batch(sql)
            .map_err(|e| anyhow!("Failed to execute SQL script: {}", e))
    }

    /// Begin an unchecked transaction
    ///
    /// Dropping the returned transaction without committing rolls it back.
    pub fn transaction(&self) -> Result<rusqlite::Transaction<'_>> {
        self.conn
            .unchecked_transaction()
            .map_err(|e| anyhow!("Failed to begin transaction: {}", e))
    }

    /// Check if a table exists in the database
    pub fn table_exists(&self, table_name: &str) -> Result<bool> {
        let count: i32 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                [table_name],
                |row| row.get(0),
            )
            .map_err(|e| anyhow!("Failed to check table existence: {}", e))?;
        Ok(count > 0)
    }

    /// Check if a column exists on a table
    pub fn column_exists(&self, table_name: &str, column_name: &str) -> Result<bool> {
        let count: i32 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM pragma_table_info(?1) WHERE name=?2",
                [table_name, column_name],
                |row| row.get(0),
            )
            .map_err(|e| anyhow!("Failed to check column existence: {}", e))?;
        Ok(count > 0)
    }

    /// Get the row count for a table
    pub fn table_count(&self, table_name: &str) -> Result<u64> {
        let query = format!("SELECT COUNT(*) FROM {}", table_name);
        let count: u64 = self
            .conn
            .query_row(&query, [], |row| row.get(0))
            .map_err(|e| anyhow!("Failed to get table count: {}", e))?;
        Ok(count)
    }
}

/// Source of scoped database connections
///
/// Each call to [`acquire`](ConnectionProvider::acquire) hands out a
/// connection owned by the caller; it is released when the returned value
/// goes out of scope, on success and error paths alike.
pub trait ConnectionProvider {
    fn acquire(&self) -> Result<DatabaseConn>;
}

impl<P: ConnectionProvider + ?Sized> ConnectionProvider for &P {
    fn acquire(&self) -> Result<DatabaseConn> {
        (**self).acquire()
    }
}

/// Provider backed by a single SQLite database file
///
/// Every acquisition opens a fresh, fully configured connection to the file.
/// Acquiring never creates the file; only [`SqliteFile::create`] does.
#[derive(Debug, Clone)]
pub struct SqliteFile {
    path: PathBuf,
}

impl SqliteFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the underlying database file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the database file is present on disk
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Open the database file, creating it if it does not exist
    pub fn create(&self) -> Result<DatabaseConn> {
        DatabaseConn::open_path(self.path_str()?)
    }

    fn path_str(&self) -> Result<&str> {
        self.path
            .to_str()
            .ok_or_else(|| anyhow!("Database path is not valid UTF-8: {:?}", self.path))
    }
}

impl ConnectionProvider for SqliteFile {
    fn acquire(&self) -> Result<DatabaseConn> {
        DatabaseConn::open_existing(self.path_str()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_in_memory() {
        let db = DatabaseConn::open_in_memory();
        assert!(db.is_ok());
    }

    #[test]
    fn test_foreign_keys_enabled() {
        let db = DatabaseConn::open_in_memory().unwrap();
        let enabled: i32 = db
            .conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(enabled, 1);
    }

    #[test]
    fn test_table_exists() {
        let db = DatabaseConn::open_in_memory().unwrap();
        db.execute("CREATE TABLE test_table (id INTEGER PRIMARY KEY)")
            .unwrap();

        assert!(db.table_exists("test_table").unwrap());
        assert!(!db.table_exists("nonexistent_table").unwrap());
    }

    #[test]
    fn test_column_exists() {
        let db = DatabaseConn::open_in_memory().unwrap();
        db.execute("CREATE TABLE test_table (id INTEGER PRIMARY KEY, name TEXT)")
            .unwrap();

        assert!(db.column_exists("test_table", "name").unwrap());
        assert!(!db.column_exists("test_table", "missing").unwrap());
    }

    #[test]
    fn test_execute_script_runs_every_statement() {
        let db = DatabaseConn::open_in_memory().unwrap();
        db.execute_script(
            "-- setup\nCREATE TABLE t (id INTEGER);\nINSERT INTO t VALUES (1);\nINSERT INTO t VALUES (2);",
        )
        .unwrap();

        assert_eq!(db.table_count("t").unwrap(), 2);
    }

    #[test]
    fn test_dropped_transaction_rolls_back() {
        let db = DatabaseConn::open_in_memory().unwrap();
        db.execute("CREATE TABLE t (id INTEGER)").unwrap();
        {
            let tx = db.transaction().unwrap();
            tx.execute("INSERT INTO t VALUES (1)", []).unwrap();
        }
        assert_eq!(db.table_count("t").unwrap(), 0);
    }

    #[test]
    fn test_acquire_does_not_create_file() {
        let dir = tempfile::tempdir().unwrap();
        let provider = SqliteFile::new(dir.path().join("data.db"));

        assert!(provider.acquire().is_err());
        assert!(!provider.exists());
    }

    #[test]
    fn test_sqlite_file_shares_state_across_acquisitions() {
        let dir = tempfile::tempdir().unwrap();
        let provider = SqliteFile::new(dir.path().join("data.db"));
        assert!(!provider.exists());

        provider
            .create()
            .unwrap()
            .execute("CREATE TABLE t (id INTEGER)")
            .unwrap();

        assert!(provider.exists());
        assert!(provider.acquire().unwrap().table_exists("t").unwrap());
    }
}
