#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

//! Waybill - schema migrations for the transport system store
//!
//! Waybill keeps the embedded SQLite database of the transport system
//! (products, packaging, vehicles) at the schema version the running build
//! expects. It can be used as a command-line maintenance tool or as a library
//! called once at application startup.
//!
//! # Feature Flags
//!
//! | Feature | Description | Key Dependencies |
//! |---------|-------------|------------------|
//! | `display` | Table formatting with `tabled` | `tabled` |
//! | `cli` | The `waybill` binary | All above + `clap`, `tracing-subscriber` |
//!
//! ```toml
//! # Library only
//! waybill = { version = "0.3", default-features = false }
//!
//! # Default (CLI binary)
//! waybill = "0.3"
//! ```
//!
//! # Architecture
//!
//! - **[`database`]**: SQLite connections, the baseline schema, the version record
//!   and the `WaybillDatabase` startup handle
//! - **[`migration`]**: Script loading, statement classification, execution and the
//!   run state machine
//! - **[`config`]**: Configuration management
//! - **[`output`]**: Output formats for command results
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use waybill::{WaybillConfig, WaybillDatabase};
//!
//! let config = WaybillConfig::new(&None)?;
//! let (db, report) = WaybillDatabase::prepare(&config)?;
//! if !report.succeeded() {
//!     eprintln!("running on schema {}", db.status()?);
//! }
//! ```
//!
//! ## Custom script sources
//!
//! ```rust,ignore
//! use waybill::database::SqliteFile;
//! use waybill::migration::{DirScriptLoader, Migrator, QuoteAwareSplitter, VersionPolicy};
//!
//! let provider = SqliteFile::new("/srv/waybill/data.db");
//! let report = Migrator::new(&provider, DirScriptLoader::new("/srv/waybill/sql"))
//!     .with_splitter(QuoteAwareSplitter)
//!     .with_policy(VersionPolicy::Persist)
//!     .run();
//! println!("{}", report.state);
//! ```

pub mod config;
pub mod database;
pub mod migration;
pub mod output;

pub use config::WaybillConfig;

pub use database::{
    ConnectionProvider, DatabaseConn, SchemaDefinitions, SchemaManager, SchemaStatus, SqliteFile,
    VersionStore, WaybillDatabase, BASELINE_SCHEMA_VERSION, TARGET_SCHEMA_VERSION,
};

pub use migration::{
    MigrationError, MigrationPlan, MigrationReport, MigrationState, Migrator, VersionPolicy,
};

pub use output::OutputFormat;
