//! Migration error taxonomy
//!
//! Every failure the migration path can produce is one of these variants.
//! The [`Migrator`](super::Migrator) decides which ones halt a run and which
//! are only recorded.

use serde::Serialize;

/// Errors that can occur while migrating a database
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum MigrationError {
    /// The schema version record could not be read
    VersionUnavailable(String),
    /// A script known to exist could not be read
    ScriptReadError { version: u32, cause: String },
    /// A transactional statement failed; the whole transactional batch was rolled back
    TransactionalApply { statement: String, cause: String },
    /// A single drop statement failed
    DropApply { statement: String, cause: String },
}

impl MigrationError {
    /// Whether this error ends the run it occurred in
    pub fn halts_run(&self) -> bool {
        !matches!(self, MigrationError::DropApply { .. })
    }
}

impl std::fmt::Display for MigrationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MigrationError::VersionUnavailable(e) => {
                write!(f, "Schema version unavailable: {}", e)
            }
            MigrationError::ScriptReadError { version, cause } => {
                write!(f, "Failed to read migration script {}: {}", version, cause)
            }
            MigrationError::TransactionalApply { statement, cause } => {
                write!(
                    f,
                    "Transactional statement failed, batch rolled back: `{}`: {}",
                    statement, cause
                )
            }
            MigrationError::DropApply { statement, cause } => {
                write!(f, "Drop statement failed: `{}`: {}", statement, cause)
            }
        }
    }
}

impl std::error::Error for MigrationError {}
