//! Database module
//!
//! All storage functionality for waybill:
//!
//! - **core**: SQLite connections, the baseline schema and the version record
//! - **store**: `WaybillDatabase`, the application handle that bootstraps and migrates
//!
//! # Architecture
//!
//! ```text
//! database/
//! ├── core/            # Foundation
//! │   ├── connection   # DatabaseConn wrapper + ConnectionProvider
//! │   ├── schema       # Baseline schema and status checks
//! │   └── version      # VersionStore (single-row version record)
//! │
//! └── store            # WaybillDatabase startup sequence
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use waybill::config::WaybillConfig;
//! use waybill::database::WaybillDatabase;
//!
//! let config = WaybillConfig::new(&None)?;
//! let (db, report) = WaybillDatabase::prepare(&config)?;
//! println!("schema {} ({})", db.status()?, report.state);
//! ```

pub mod core;
mod store;

pub use core::{
    ConnectionProvider, DatabaseConn, SchemaDefinitions, SchemaManager, SchemaStatus, SqliteFile,
    VersionStore, BASELINE_SCHEMA_VERSION, TARGET_SCHEMA_VERSION,
};
pub use store::WaybillDatabase;
