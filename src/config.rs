use anyhow::{anyhow, Result};
use config::Config;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::migration::VersionPolicy;

pub struct WaybillConfig {
    /// Directory holding the database file
    pub data_dir: String,

    /// Database file name inside `data_dir` (default: data.db)
    pub database_file: String,

    /// Directory with `<version>.sql` migration scripts; bundled scripts are used when unset
    pub scripts_dir: Option<String>,

    /// Record the new schema version after a successful migration (default: true)
    pub persist_version: bool,
}

const EMPTY_CONFIG: &str = r#"### waybill configuration file

### directory holding the database file
# data_dir = "~/.waybill"

### database file name inside data_dir
# database_file = "data.db"

### directory with <version>.sql migration scripts (bundled scripts when unset)
# scripts_dir = "/opt/waybill/migrations"

### record the new schema version after migrating; false re-applies on every start
# persist_version = true
"#;

const DEFAULT_DATABASE_FILE: &str = "data.db";

fn default_data_dir() -> String {
    let home_dir = dirs::home_dir()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|| ".".to_string());
    format!("{}/.waybill", home_dir)
}

impl Default for WaybillConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            database_file: DEFAULT_DATABASE_FILE.to_string(),
            scripts_dir: None,
            persist_version: true,
        }
    }
}

impl WaybillConfig {
    /// Function to create and initialize a new configuration
    pub fn new(path: &Option<String>) -> Result<WaybillConfig> {
        // E.g., `WAYBILL_DATA_DIR=/srv/waybill ./waybill migrate` would set the data directory
        Self::load(path, config::Environment::with_prefix("WAYBILL"))
    }

    /// Load the configuration file at `path` (or the default one), overridden by `env`
    fn load(path: &Option<String>, env: config::Environment) -> Result<WaybillConfig> {
        let mut builder = Config::builder();

        // Add in toml configuration file
        match path {
            Some(p) => {
                let path = Path::new(p.as_str());
                if path.exists() {
                    let path_str = path
                        .to_str()
                        .ok_or_else(|| anyhow!("Could not convert path to string"))?;
                    builder = builder.add_source(config::File::with_name(path_str));
                } else {
                    std::fs::write(p.as_str(), EMPTY_CONFIG)
                        .map_err(|e| anyhow!("Unable to create config file: {}", e))?;
                }
            }
            None => {
                let waybill_dir = default_data_dir();
                std::fs::create_dir_all(waybill_dir.as_str())
                    .map_err(|e| anyhow!("Unable to create waybill directory: {}", e))?;
                let p = Self::config_file_path();
                if Path::new(p.as_str()).exists() {
                    builder = builder.add_source(config::File::with_name(p.as_str()));
                } else {
                    std::fs::write(p.as_str(), EMPTY_CONFIG).map_err(|e| {
                        anyhow!("Unable to create config file {}: {}", p.as_str(), e)
                    })?;
                }
            }
        }

        // Add in settings from the environment (with a prefix of WAYBILL)
        builder = builder.add_source(env);

        let settings = builder
            .build()
            .map_err(|e| anyhow!("Failed to build configuration: {}", e))?;

        let config = settings
            .try_deserialize::<HashMap<String, String>>()
            .map_err(|e| anyhow!("Failed to deserialize configuration: {}", e))?;

        Self::from_map(&config)
    }

    /// Build a configuration from flat key/value settings
    fn from_map(config: &HashMap<String, String>) -> Result<WaybillConfig> {
        let data_dir = match config.get("data_dir") {
            Some(p) => expand_home(p),
            None => default_data_dir(),
        };

        let database_file = config
            .get("database_file")
            .cloned()
            .unwrap_or_else(|| DEFAULT_DATABASE_FILE.to_string());
        if database_file.contains('/') {
            return Err(anyhow!(
                "database_file must be a file name, got '{}'",
                database_file
            ));
        }

        let scripts_dir = config.get("scripts_dir").map(|p| expand_home(p));

        let persist_version = match config.get("persist_version") {
            Some(v) => v
                .parse()
                .map_err(|_| anyhow!("persist_version must be true or false, got '{}'", v))?,
            None => true,
        };

        Ok(WaybillConfig {
            data_dir,
            database_file,
            scripts_dir,
            persist_version,
        })
    }

    /// Get the path to the SQLite database file
    pub fn sqlite_path(&self) -> PathBuf {
        Path::new(self.data_dir.trim_end_matches('/')).join(&self.database_file)
    }

    /// Version record policy derived from `persist_version`
    pub fn version_policy(&self) -> VersionPolicy {
        if self.persist_version {
            VersionPolicy::Persist
        } else {
            VersionPolicy::ReapplyEveryBoot
        }
    }

    /// Display configuration summary
    pub fn summary(&self) -> String {
        let lines = [
            format!("Data Directory:     {}", self.data_dir),
            format!("SQLite Path:        {}", self.sqlite_path().display()),
            format!(
                "Scripts:            {}",
                self.scripts_dir.as_deref().unwrap_or("bundled")
            ),
            format!("Persist Version:    {}", self.persist_version),
        ];
        lines.join("\n")
    }

    /// Get the config file path
    pub fn config_file_path() -> String {
        format!("{}/waybill.toml", default_data_dir())
    }
}

/// Expand a leading `~/` to the home directory
fn expand_home(path: &str) -> String {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest).to_string_lossy().to_string(),
        _ => path.to_string(),
    }
}
