//! Database schema management
//!
//! This module holds the baseline schema, the schema version record layout and
//! the version constants the migration runner compares against.

use anyhow::{anyhow, Result};
use rusqlite::OptionalExtension;
use serde::Serialize;

use crate::database::core::DatabaseConn;

/// Schema version required by this build
///
/// Increment this together with a new script under `sql/migrations/`.
pub const TARGET_SCHEMA_VERSION: u32 = 3;

/// Schema version a freshly bootstrapped database starts at
pub const BASELINE_SCHEMA_VERSION: u32 = 1;

/// Schema definitions shared by bootstrap and the version store
pub struct SchemaDefinitions;

impl SchemaDefinitions {
    /// Baseline schema, executed verbatim once into a new database file
    pub const BASELINE: &'static str = include_str!("../../../sql/schema.sql");

    /// Tables the baseline schema must have created
    pub const BASELINE_TABLES: &'static [&'static str] = &[
        "Tipo_Produto",
        "Produto",
        "Tipo_Embalagem",
        "Embalagem",
        "Tipo_Veiculo",
        "Veiculo",
    ];

    /// SQL for creating the schema version table (single row, id = 1)
    pub const VERSION_TABLE: &'static str = r#"
        CREATE TABLE IF NOT EXISTS waybill_schema_version (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            version INTEGER NOT NULL,
            updated_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );
    "#;

    /// SQL for seeding the version record; leaves an existing record untouched
    pub const SEED_VERSION: &'static str = "INSERT OR IGNORE INTO waybill_schema_version (id, version, updated_at) VALUES (1, ?1, strftime('%s', 'now'))";
}

/// Schema manager for one database connection
///
/// Handles baseline initialization and status checks.
pub struct SchemaManager<'a> {
    db: &'a DatabaseConn,
}

impl<'a> SchemaManager<'a> {
    /// Create a new schema manager for the given connection
    pub fn new(db: &'a DatabaseConn) -> Self {
        Self { db }
    }

    /// Initialize a fresh database
    ///
    /// Runs the baseline script as-is, then creates and seeds the version
    /// record with [`BASELINE_SCHEMA_VERSION`].
    pub fn initialize(&self) -> Result<()> {
        self.db
            .execute_script(SchemaDefinitions::BASELINE)
            .map_err(|e| anyhow!("Failed to execute baseline schema: {}", e))?;

        self.db
            .execute(SchemaDefinitions::VERSION_TABLE)
            .map_err(|e| anyhow!("Failed to create schema version table: {}", e))?;

        self.db
            .conn
            .execute(SchemaDefinitions::SEED_VERSION, [BASELINE_SCHEMA_VERSION])
            .map_err(|e| anyhow!("Failed to seed schema version: {}", e))?;

        Ok(())
    }

    /// Check the current schema status against `target`
    pub fn check_status(&self, target: u32) -> Result<SchemaStatus> {
        if !self.db.table_exists("waybill_schema_version")? {
            return Ok(SchemaStatus::NotInitialized);
        }

        let current_version = match self.get_schema_version()? {
            Some(v) => v,
            None => return Ok(SchemaStatus::NotInitialized),
        };

        if current_version == target {
            if self.verify_integrity()? {
                Ok(SchemaStatus::Current)
            } else {
                Ok(SchemaStatus::Corrupted)
            }
        } else if current_version < target {
            Ok(SchemaStatus::NeedsMigration {
                from: current_version,
                to: target,
            })
        } else {
            // Database was migrated by a newer build
            Ok(SchemaStatus::Incompatible {
                database_version: current_version,
                required_version: target,
            })
        }
    }

    /// Get the stored schema version, if the record exists
    fn get_schema_version(&self) -> Result<Option<u32>> {
        let version: Option<i64> = self
            .db
            .conn
            .query_row(
                "SELECT version FROM waybill_schema_version WHERE id = 1",
                [],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| anyhow!("Failed to read schema version: {}", e))?;

        version
            .map(|v| u32::try_from(v).map_err(|_| anyhow!("Invalid schema version: {}", v)))
            .transpose()
    }

    /// Verify schema integrity by checking the baseline tables exist
    fn verify_integrity(&self) -> Result<bool> {
        for table in SchemaDefinitions::BASELINE_TABLES {
            if !self.db.table_exists(table)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// Status of the database schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SchemaStatus {
    /// Database has no version record
    NotInitialized,

    /// Schema is at the target version and valid
    Current,

    /// Schema is behind the target version
    NeedsMigration { from: u32, to: u32 },

    /// Database is ahead of this build
    Incompatible {
        database_version: u32,
        required_version: u32,
    },

    /// Version is current but baseline tables are missing
    Corrupted,
}

impl std::fmt::Display for SchemaStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchemaStatus::NotInitialized => write!(f, "not initialized"),
            SchemaStatus::Current => write!(f, "current"),
            SchemaStatus::NeedsMigration { from, to } => {
                write!(f, "needs migration (v{} -> v{})", from, to)
            }
            SchemaStatus::Incompatible {
                database_version,
                required_version,
            } => write!(
                f,
                "incompatible (database v{}, build v{})",
                database_version, required_version
            ),
            SchemaStatus::Corrupted => write!(f, "corrupted"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_not_initialized() {
        let db = DatabaseConn::open_in_memory().unwrap();
        let manager = SchemaManager::new(&db);

        assert_eq!(
            manager.check_status(TARGET_SCHEMA_VERSION).unwrap(),
            SchemaStatus::NotInitialized
        );
    }

    #[test]
    fn test_schema_initialize() {
        let db = DatabaseConn::open_in_memory().unwrap();
        let manager = SchemaManager::new(&db);

        manager.initialize().unwrap();

        for table in SchemaDefinitions::BASELINE_TABLES {
            assert!(db.table_exists(table).unwrap(), "missing {}", table);
        }
        assert_eq!(
            manager.get_schema_version().unwrap(),
            Some(BASELINE_SCHEMA_VERSION)
        );
        assert_eq!(
            manager.check_status(TARGET_SCHEMA_VERSION).unwrap(),
            SchemaStatus::NeedsMigration {
                from: BASELINE_SCHEMA_VERSION,
                to: TARGET_SCHEMA_VERSION
            }
        );
        assert_eq!(
            manager.check_status(BASELINE_SCHEMA_VERSION).unwrap(),
            SchemaStatus::Current
        );
    }

    #[test]
    fn test_schema_incompatible() {
        let db = DatabaseConn::open_in_memory().unwrap();
        let manager = SchemaManager::new(&db);
        manager.initialize().unwrap();

        assert_eq!(
            manager.check_status(0).unwrap(),
            SchemaStatus::Incompatible {
                database_version: BASELINE_SCHEMA_VERSION,
                required_version: 0
            }
        );
    }

    #[test]
    fn test_schema_corrupted() {
        let db = DatabaseConn::open_in_memory().unwrap();
        let manager = SchemaManager::new(&db);
        manager.initialize().unwrap();
        db.execute("DROP TABLE Embalagem").unwrap();

        assert_eq!(
            manager.check_status(BASELINE_SCHEMA_VERSION).unwrap(),
            SchemaStatus::Corrupted
        );
    }

    #[test]
    fn test_status_display() {
        assert_eq!(SchemaStatus::Current.to_string(), "current");
        assert_eq!(
            SchemaStatus::NeedsMigration { from: 1, to: 3 }.to_string(),
            "needs migration (v1 -> v3)"
        );
    }
}
