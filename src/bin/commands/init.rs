use clap::Args;
use serde::Serialize;
use waybill::{OutputFormat, WaybillConfig, WaybillDatabase};

use super::print_json;

/// Arguments for the Init command
#[derive(Args)]
pub struct InitArgs {
    /// Also migrate to this build's schema version afterwards
    #[clap(long)]
    pub migrate: bool,
}

#[derive(Debug, Serialize)]
struct InitResult {
    path: String,
    created: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    schema_version: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    migration: Option<String>,
}

pub fn run(config: &WaybillConfig, args: InitArgs, output_format: OutputFormat) {
    let db = WaybillDatabase::from_config(config);

    let created = match db.bootstrap() {
        Ok(created) => created,
        Err(e) => {
            eprintln!("ERROR: Failed to initialize database: {}", e);
            std::process::exit(1);
        }
    };

    let migration = if args.migrate {
        let report = db.migrate(config);
        if !report.succeeded() {
            if let Some(e) = &report.error {
                eprintln!("ERROR: {}", e);
            }
        }
        Some(report.state.to_string())
    } else {
        None
    };

    let result = InitResult {
        path: db.path().to_string_lossy().to_string(),
        created,
        schema_version: db.current_version().ok(),
        migration,
    };

    if !print_json(&result, output_format) {
        if result.created {
            println!("Created database at {}", result.path);
        } else {
            println!("Database already exists at {}", result.path);
        }
        match result.schema_version {
            Some(v) => println!("Schema version: v{}", v),
            None => println!("Schema version: unavailable"),
        }
        if let Some(state) = &result.migration {
            println!("Migration: {}", state);
        }
    }
}
