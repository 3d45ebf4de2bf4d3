//! Schema version record
//!
//! The database holds exactly one row recording the schema version it is at.
//! `VersionStore` reads and replaces that row, acquiring a fresh connection
//! for every access.

use anyhow::{anyhow, Result};
use rusqlite::OptionalExtension;

use crate::database::core::connection::ConnectionProvider;
use crate::database::core::schema::SchemaDefinitions;
use crate::migration::MigrationError;

/// Reads and persists the single schema version record
pub struct VersionStore<P> {
    provider: P,
}

impl<P: ConnectionProvider> VersionStore<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Create the version table and seed it, unless a record already exists
    ///
    /// Returns `true` when the seed row was written.
    pub fn initialize(&self, seed: u32) -> Result<bool> {
        let db = self.provider.acquire()?;
        db.execute(SchemaDefinitions::VERSION_TABLE)
            .map_err(|e| anyhow!("Failed to create schema version table: {}", e))?;

        let inserted = db
            .conn
            .execute(SchemaDefinitions::SEED_VERSION, [seed])
            .map_err(|e| anyhow!("Failed to seed schema version: {}", e))?;
        Ok(inserted > 0)
    }

    /// Read the currently applied schema version
    pub fn read_current_version(&self) -> Result<u32, MigrationError> {
        let db = self
            .provider
            .acquire()
            .map_err(|e| MigrationError::VersionUnavailable(e.to_string()))?;

        let version: Option<i64> = db
            .conn
            .query_row(
                "SELECT version FROM waybill_schema_version WHERE id = 1",
                [],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| MigrationError::VersionUnavailable(e.to_string()))?;

        match version {
            Some(v) => u32::try_from(v).map_err(|_| {
                MigrationError::VersionUnavailable(format!("invalid stored version {}", v))
            }),
            None => Err(MigrationError::VersionUnavailable(
                "schema version record is missing".to_string(),
            )),
        }
    }

    /// Replace the stored schema version
    pub fn write_current_version(&self, version: u32) -> Result<()> {
        let db = self.provider.acquire()?;
        db.conn
            .execute(
                "INSERT OR REPLACE INTO waybill_schema_version (id, version, updated_at) VALUES (1, ?1, strftime('%s', 'now'))",
                [version],
            )
            .map_err(|e| anyhow!("Failed to write schema version {}: {}", version, e))?;
        Ok(())
    }

    /// Unix timestamp of the last write to the version record, if any
    pub fn last_updated(&self) -> Result<Option<i64>> {
        let db = self.provider.acquire()?;
        if !db.table_exists("waybill_schema_version")? {
            return Ok(None);
        }
        db.conn
            .query_row(
                "SELECT updated_at FROM waybill_schema_version WHERE id = 1",
                [],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| anyhow!("Failed to read schema version timestamp: {}", e))
    }
}
