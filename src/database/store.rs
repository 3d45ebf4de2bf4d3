//! Application database handle
//!
//! `WaybillDatabase` owns the path to the store and runs the startup sequence:
//! create and bootstrap the file if it does not exist yet, then migrate it to
//! the build's schema version. A failed migration is logged and the database
//! is still handed back at whatever version it was left at.

use std::path::Path;

use anyhow::{anyhow, Result};
use tracing::{error, info, warn};

use crate::config::WaybillConfig;
use crate::database::core::{ConnectionProvider, SchemaManager, SchemaStatus, SqliteFile};
use crate::database::core::{VersionStore, TARGET_SCHEMA_VERSION};
use crate::migration::{
    DirScriptLoader, EmbeddedScriptLoader, MigrationError, MigrationPlan, MigrationReport,
    Migrator, ScriptLoader, VersionPolicy,
};

/// Main database handle for the transport system store
pub struct WaybillDatabase {
    provider: SqliteFile,
}

impl WaybillDatabase {
    /// Handle for the database file at `path`; nothing is touched on disk
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            provider: SqliteFile::new(path.as_ref()),
        }
    }

    /// Handle for the database file described by `config`
    pub fn from_config(config: &WaybillConfig) -> Self {
        Self::new(config.sqlite_path())
    }

    pub fn path(&self) -> &Path {
        self.provider.path()
    }

    /// The connection provider for this database
    pub fn provider(&self) -> &SqliteFile {
        &self.provider
    }

    /// Create and initialize the database file if it does not exist
    ///
    /// Returns `true` when a new database was bootstrapped. An existing file
    /// is left untouched.
    pub fn bootstrap(&self) -> Result<bool> {
        if self.provider.exists() {
            return Ok(false);
        }

        if let Some(parent) = self.path().parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                anyhow!(
                    "Failed to create data directory '{}': {}",
                    parent.display(),
                    e
                )
            })?;
        }

        info!("Initializing database at {}", self.path().display());
        let db = self.provider.create()?;
        if let Err(e) = SchemaManager::new(&db).initialize() {
            drop(db);
            // a half-initialized file would be mistaken for a real one on the next start
            if let Err(remove_err) = std::fs::remove_file(self.path()) {
                error!(
                    "Failed to remove partially initialized database {}: {}",
                    self.path().display(),
                    remove_err
                );
            }
            return Err(e);
        }
        Ok(true)
    }

    /// Current schema status relative to this build
    pub fn status(&self) -> Result<SchemaStatus> {
        if !self.provider.exists() {
            return Ok(SchemaStatus::NotInitialized);
        }
        let db = self.provider.acquire()?;
        SchemaManager::new(&db).check_status(TARGET_SCHEMA_VERSION)
    }

    /// Read the stored schema version
    pub fn current_version(&self) -> Result<u32, MigrationError> {
        VersionStore::new(&self.provider).read_current_version()
    }

    /// Unix timestamp of the last version record write
    pub fn version_updated_at(&self) -> Result<Option<i64>> {
        if !self.provider.exists() {
            return Ok(None);
        }
        VersionStore::new(&self.provider).last_updated()
    }

    /// Migrate with the given script source and version policy
    pub fn migrate_with<L: ScriptLoader>(
        &self,
        loader: L,
        policy: VersionPolicy,
    ) -> MigrationReport {
        Migrator::new(&self.provider, loader)
            .with_policy(policy)
            .run()
    }

    /// Plan a migration with the given script source
    pub fn plan_with<L: ScriptLoader>(&self, loader: L) -> Result<MigrationPlan, MigrationError> {
        Migrator::new(&self.provider, loader).plan()
    }

    /// Migrate using the scripts and policy from `config`
    pub fn migrate(&self, config: &WaybillConfig) -> MigrationReport {
        match &config.scripts_dir {
            Some(dir) => self.migrate_with(DirScriptLoader::new(dir), config.version_policy()),
            None => self.migrate_with(EmbeddedScriptLoader::bundled(), config.version_policy()),
        }
    }

    /// Plan a migration using the scripts from `config`
    pub fn plan(&self, config: &WaybillConfig) -> Result<MigrationPlan, MigrationError> {
        match &config.scripts_dir {
            Some(dir) => self.plan_with(DirScriptLoader::new(dir)),
            None => self.plan_with(EmbeddedScriptLoader::bundled()),
        }
    }

    /// Startup sequence: bootstrap when missing, then migrate
    ///
    /// Fails only if bootstrapping fails. Migration problems are logged and
    /// reported; the application can continue on the old schema.
    pub fn prepare(config: &WaybillConfig) -> Result<(Self, MigrationReport)> {
        let db = Self::from_config(config);
        if db.bootstrap()? {
            info!("Database created at schema v{}", db.current_version()?);
        }

        let report = db.migrate(config);
        if !report.succeeded() {
            warn!(
                "Database migration did not complete; continuing at schema v{}",
                report
                    .from_version
                    .map(|v| v.to_string())
                    .unwrap_or_else(|| "?".to_string())
            );
        }
        Ok((db, report))
    }
}
