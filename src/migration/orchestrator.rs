//! Migration orchestration
//!
//! `Migrator` walks a database from its recorded schema version up to the
//! build's target version:
//!
//! ```text
//! Idle -> VersionChecked -> UpToDate
//!                        -> RangeGathered -> Classified -> TransactionalApplied
//!                           -> DropsApplied -> Persisted
//! ```
//!
//! Any halting error ends the run in `Halted`. Nothing is propagated to the
//! caller: a failed run leaves the schema at its previous version and the
//! report says why.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::database::{ConnectionProvider, VersionStore, TARGET_SCHEMA_VERSION};
use crate::migration::classifier::{
    MigrationBatch, NaiveSplitter, StatementClassifier, StatementSplitter,
};
use crate::migration::executor::MigrationExecutor;
use crate::migration::loader::{gather_scripts, ScriptLoader};
use crate::migration::MigrationError;

/// What happens to the version record after a successful run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum VersionPolicy {
    /// Write the target version back once drops have been applied
    #[default]
    Persist,
    /// Leave the record untouched, so every start migrates the same range again
    ReapplyEveryBoot,
}

/// Migration run states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationState {
    Idle,
    VersionChecked,
    UpToDate,
    RangeGathered,
    Classified,
    TransactionalApplied,
    DropsApplied,
    Persisted,
    Halted,
}

impl std::fmt::Display for MigrationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            MigrationState::Idle => "idle",
            MigrationState::VersionChecked => "version checked",
            MigrationState::UpToDate => "up to date",
            MigrationState::RangeGathered => "range gathered",
            MigrationState::Classified => "classified",
            MigrationState::TransactionalApplied => "transactional applied",
            MigrationState::DropsApplied => "drops applied",
            MigrationState::Persisted => "persisted",
            MigrationState::Halted => "halted",
        };
        write!(f, "{}", name)
    }
}

/// Outcome of one migration run
#[derive(Debug, Clone, Serialize)]
pub struct MigrationReport {
    pub state: MigrationState,
    /// Version read from the database, if it could be read
    pub from_version: Option<u32>,
    pub target_version: u32,
    pub statement_count: usize,
    pub transactional_applied: usize,
    pub drops_applied: usize,
    pub drop_failures: Vec<MigrationError>,
    /// The error that halted the run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<MigrationError>,
    /// Set when the run succeeded but the new version could not be written
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persist_error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl MigrationReport {
    fn new(target_version: u32) -> Self {
        let now = Utc::now();
        Self {
            state: MigrationState::Idle,
            from_version: None,
            target_version,
            statement_count: 0,
            transactional_applied: 0,
            drops_applied: 0,
            drop_failures: Vec::new(),
            error: None,
            persist_error: None,
            started_at: now,
            finished_at: now,
        }
    }

    fn halt(mut self, err: MigrationError) -> Self {
        error!("migration halted after '{}': {}", self.state, err);
        self.state = MigrationState::Halted;
        self.error = Some(err);
        self.finish()
    }

    fn finish(mut self) -> Self {
        self.finished_at = Utc::now();
        self
    }

    /// Whether the schema reached (or already was at) the target version
    pub fn succeeded(&self) -> bool {
        matches!(
            self.state,
            MigrationState::UpToDate | MigrationState::DropsApplied | MigrationState::Persisted
        )
    }
}

/// Statements a run would apply, computed without touching the schema
#[derive(Debug, Clone, Serialize)]
pub struct MigrationPlan {
    pub from_version: u32,
    pub target_version: u32,
    pub batch: MigrationBatch,
}

impl MigrationPlan {
    pub fn is_up_to_date(&self) -> bool {
        self.from_version >= self.target_version
    }
}

/// Brings a database up to the target schema version
pub struct Migrator<P, L, S = NaiveSplitter> {
    provider: P,
    loader: L,
    classifier: StatementClassifier<S>,
    target: u32,
    policy: VersionPolicy,
}

impl<P: ConnectionProvider, L: ScriptLoader> Migrator<P, L> {
    /// Create a migrator targeting [`TARGET_SCHEMA_VERSION`]
    pub fn new(provider: P, loader: L) -> Self {
        Self {
            provider,
            loader,
            classifier: StatementClassifier::new(),
            target: TARGET_SCHEMA_VERSION,
            policy: VersionPolicy::default(),
        }
    }
}

impl<P: ConnectionProvider, L: ScriptLoader, S: StatementSplitter> Migrator<P, L, S> {
    pub fn with_target(mut self, target: u32) -> Self {
        self.target = target;
        self
    }

    pub fn with_policy(mut self, policy: VersionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Replace the statement splitter
    pub fn with_splitter<T: StatementSplitter>(self, splitter: T) -> Migrator<P, L, T> {
        Migrator {
            provider: self.provider,
            loader: self.loader,
            classifier: StatementClassifier::with_splitter(splitter),
            target: self.target,
            policy: self.policy,
        }
    }

    pub fn target(&self) -> u32 {
        self.target
    }

    /// Compute what a run would apply, without executing anything
    pub fn plan(&self) -> Result<MigrationPlan, MigrationError> {
        let from_version = VersionStore::new(&self.provider).read_current_version()?;
        let batch = if from_version >= self.target {
            MigrationBatch::default()
        } else {
            let text = gather_scripts(&self.loader, from_version, self.target)?;
            self.classifier.classify(&text)
        };
        Ok(MigrationPlan {
            from_version,
            target_version: self.target,
            batch,
        })
    }

    /// Run the migration state machine to completion
    pub fn run(&self) -> MigrationReport {
        let mut report = MigrationReport::new(self.target);
        let versions = VersionStore::new(&self.provider);

        let current = match versions.read_current_version() {
            Ok(v) => v,
            Err(e) => return report.halt(e),
        };
        report.from_version = Some(current);
        report.state = MigrationState::VersionChecked;

        if current >= self.target {
            info!(
                "schema at v{} (target v{}), nothing to migrate",
                current, self.target
            );
            report.state = MigrationState::UpToDate;
            return report.finish();
        }

        info!("migrating schema from v{} to v{}", current, self.target);
        let text = match gather_scripts(&self.loader, current, self.target) {
            Ok(text) => text,
            Err(e) => return report.halt(e),
        };
        report.state = MigrationState::RangeGathered;

        let batch = self.classifier.classify(&text);
        report.statement_count = batch.len();
        report.state = MigrationState::Classified;
        info!(
            "{} transactional and {} drop statements to apply",
            batch.transactional.len(),
            batch.drops.len()
        );

        let executor = MigrationExecutor::new(&self.provider);
        match executor.apply_transactional(&batch) {
            Ok(applied) => report.transactional_applied = applied,
            Err(e) => return report.halt(e),
        }
        report.state = MigrationState::TransactionalApplied;

        for outcome in executor.apply_drops(&batch) {
            match outcome.error {
                Some(e) => {
                    warn!("{}", e);
                    report.drop_failures.push(e);
                }
                None => report.drops_applied += 1,
            }
        }
        report.state = MigrationState::DropsApplied;

        match self.policy {
            VersionPolicy::Persist => match versions.write_current_version(self.target) {
                Ok(()) => {
                    info!("schema version set to v{}", self.target);
                    report.state = MigrationState::Persisted;
                }
                Err(e) => {
                    error!("migration applied but version was not recorded: {}", e);
                    report.persist_error = Some(e.to_string());
                }
            },
            VersionPolicy::ReapplyEveryBoot => {
                info!("version record left at v{}", current);
            }
        }

        report.finish()
    }
}
