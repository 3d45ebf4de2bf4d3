//! Migration script loading
//!
//! The script for version `v` holds the changes that move a database from
//! `v` to `v + 1`. A version without a script is valid and contributes nothing.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::migration::MigrationError;

/// Locates and loads the raw text of migration scripts
pub trait ScriptLoader {
    /// Load the script for `version`, or `None` if no script is registered
    fn load_script(&self, version: u32) -> Result<Option<String>, MigrationError>;
}

impl<L: ScriptLoader + ?Sized> ScriptLoader for &L {
    fn load_script(&self, version: u32) -> Result<Option<String>, MigrationError> {
        (**self).load_script(version)
    }
}

/// Concatenate the scripts for versions `from..to` in ascending order
///
/// Present scripts are joined with a line break; absent versions are skipped.
pub fn gather_scripts<L: ScriptLoader>(
    loader: &L,
    from: u32,
    to: u32,
) -> Result<String, MigrationError> {
    let mut scripts = Vec::new();
    for version in from..to {
        match loader.load_script(version)? {
            Some(text) => scripts.push(text),
            None => debug!("no migration script for version {}", version),
        }
    }
    Ok(scripts.join("\n"))
}

/// Loads `<dir>/<version>.sql` files from a directory
#[derive(Debug, Clone)]
pub struct DirScriptLoader {
    dir: PathBuf,
}

impl DirScriptLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path the script for `version` is expected at
    pub fn script_path(&self, version: u32) -> PathBuf {
        self.dir.join(format!("{}.sql", version))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ScriptLoader for DirScriptLoader {
    fn load_script(&self, version: u32) -> Result<Option<String>, MigrationError> {
        let path = self.script_path(version);
        match std::fs::read_to_string(&path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(MigrationError::ScriptReadError {
                version,
                cause: format!("{}: {}", path.display(), e),
            }),
        }
    }
}

/// Scripts compiled into the binary
#[derive(Debug, Clone, Copy)]
pub struct EmbeddedScriptLoader {
    scripts: &'static [(u32, &'static str)],
}

impl EmbeddedScriptLoader {
    pub const fn new(scripts: &'static [(u32, &'static str)]) -> Self {
        Self { scripts }
    }

    /// The migration scripts shipped with this build
    pub const fn bundled() -> Self {
        Self::new(BUNDLED_SCRIPTS)
    }

    /// Versions that have a script, in registration order
    pub fn versions(&self) -> impl Iterator<Item = u32> + '_ {
        self.scripts.iter().map(|(version, _)| *version)
    }
}

impl ScriptLoader for EmbeddedScriptLoader {
    fn load_script(&self, version: u32) -> Result<Option<String>, MigrationError> {
        Ok(self
            .scripts
            .iter()
            .find(|(v, _)| *v == version)
            .map(|(_, text)| text.to_string()))
    }
}

const BUNDLED_SCRIPTS: &[(u32, &str)] = &[
    (1, include_str!("../../sql/migrations/1.sql")),
    (2, include_str!("../../sql/migrations/2.sql")),
];
