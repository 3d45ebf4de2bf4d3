//! Core database infrastructure
//!
//! This module provides the foundational database components used throughout waybill:
//! - `DatabaseConn`: Core SQLite connection wrapper with configuration
//! - `ConnectionProvider` / `SqliteFile`: scoped connection acquisition
//! - `SchemaManager`: Baseline initialization and status checks
//! - `VersionStore`: The single schema version record

mod connection;
mod schema;
mod version;

pub use connection::{ConnectionProvider, DatabaseConn, SqliteFile};
pub use schema::{
    SchemaDefinitions, SchemaManager, SchemaStatus, BASELINE_SCHEMA_VERSION,
    TARGET_SCHEMA_VERSION,
};
pub use version::VersionStore;
