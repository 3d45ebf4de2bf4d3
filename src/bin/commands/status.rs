use serde::Serialize;
use waybill::{
    OutputFormat, SchemaStatus, WaybillConfig, WaybillDatabase, TARGET_SCHEMA_VERSION,
};

use super::{format_timestamp, print_json};

#[derive(Debug, Serialize)]
struct DatabaseStatus {
    path: String,
    exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    size_bytes: Option<u64>,
    schema: SchemaStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    schema_version: Option<u32>,
    target_version: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    version_updated_at: Option<i64>,
}

pub fn run(config: &WaybillConfig, output_format: OutputFormat) {
    let db = WaybillDatabase::from_config(config);
    let exists = db.provider().exists();

    let schema = match db.status() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("ERROR: Failed to check schema status: {}", e);
            std::process::exit(1);
        }
    };

    let status = DatabaseStatus {
        path: db.path().to_string_lossy().to_string(),
        exists,
        size_bytes: std::fs::metadata(db.path()).ok().map(|m| m.len()),
        schema_version: if exists {
            db.current_version().ok()
        } else {
            None
        },
        version_updated_at: db.version_updated_at().ok().flatten(),
        target_version: TARGET_SCHEMA_VERSION,
        schema,
    };

    if !print_json(&status, output_format) {
        print_status_table(&status);
    }
}

fn print_status_table(status: &DatabaseStatus) {
    println!("Waybill Database Status");
    println!("=======================\n");

    println!("SQLite Database:");
    println!("  Path:           {}", status.path);
    println!(
        "  Status:         {}",
        if status.exists {
            "exists"
        } else {
            "not created"
        }
    );
    if let Some(size) = status.size_bytes {
        println!("  Size:           {}", format_size(size));
    }
    println!("  Schema:         {}", status.schema);
    if let Some(v) = status.schema_version {
        println!("  Version:        v{} (target v{})", v, status.target_version);
        println!(
            "  Updated:        {}",
            format_timestamp(status.version_updated_at)
        );
    }

    eprintln!();
    eprintln!("Commands:");
    eprintln!("  waybill init       Create the database if missing");
    eprintln!("  waybill plan       Show pending migration statements");
    eprintln!("  waybill migrate    Apply pending migrations");
}

fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
