//! Migration batch execution
//!
//! Transactional statements run in one atomic unit: all of them commit or
//! none do. Drop statements run afterwards, each in its own scope, and a
//! failing drop never stops the ones after it.

use serde::Serialize;
use tracing::{debug, warn};

use crate::database::ConnectionProvider;
use crate::migration::classifier::{MigrationBatch, Statement};
use crate::migration::MigrationError;

/// Result of applying one drop statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DropOutcome {
    pub statement: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<MigrationError>,
}

impl DropOutcome {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Applies classified migration batches against storage
pub struct MigrationExecutor<P> {
    provider: P,
}

impl<P: ConnectionProvider> MigrationExecutor<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Apply every transactional statement of `batch` atomically
    ///
    /// Stops at the first failing statement and rolls back everything applied
    /// before it. Returns the number of statements committed.
    pub fn apply_transactional(&self, batch: &MigrationBatch) -> Result<usize, MigrationError> {
        if batch.transactional.is_empty() {
            return Ok(0);
        }

        let db = self
            .provider
            .acquire()
            .map_err(|e| transactional_error("BEGIN", e))?;
        let tx = db
            .transaction()
            .map_err(|e| transactional_error("BEGIN", e))?;

        for statement in &batch.transactional {
            debug!("applying #{}: {}", statement.ordinal, statement.sql);
            if let Err(e) = tx.execute_batch(&statement.sql) {
                let err = transactional_error(&statement.sql, e);
                if let Err(rollback) = tx.rollback() {
                    warn!("rollback after failed statement also failed: {}", rollback);
                }
                return Err(err);
            }
        }

        tx.commit().map_err(|e| transactional_error("COMMIT", e))?;
        Ok(batch.transactional.len())
    }

    /// Apply each drop statement of `batch` independently
    ///
    /// Every statement is attempted; failures are recorded in the returned
    /// outcomes, one per statement, in order.
    pub fn apply_drops(&self, batch: &MigrationBatch) -> Vec<DropOutcome> {
        batch
            .drops
            .iter()
            .map(|statement| DropOutcome {
                statement: statement.sql.clone(),
                error: self.apply_drop(statement).err(),
            })
            .collect()
    }

    fn apply_drop(&self, statement: &Statement) -> Result<(), MigrationError> {
        debug!("applying #{}: {}", statement.ordinal, statement.sql);
        let db = self
            .provider
            .acquire()
            .map_err(|e| drop_error(statement, e))?;
        db.conn
            .execute_batch(&statement.sql)
            .map_err(|e| drop_error(statement, e))
    }
}

fn transactional_error(statement: &str, cause: impl std::fmt::Display) -> MigrationError {
    MigrationError::TransactionalApply {
        statement: statement.to_string(),
        cause: cause.to_string(),
    }
}

fn drop_error(statement: &Statement, cause: impl std::fmt::Display) -> MigrationError {
    MigrationError::DropApply {
        statement: statement.sql.clone(),
        cause: cause.to_string(),
    }
}
