use clap::Args;
use serde::Serialize;
use std::path::Path;
use waybill::migration::EmbeddedScriptLoader;
use waybill::{OutputFormat, VersionPolicy, WaybillConfig};

use super::print_json;

/// Arguments for the Config command
#[derive(Args)]
pub struct ConfigArgs {
    /// List the migration scripts that would be used
    #[clap(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Serialize)]
struct ConfigInfo {
    config_file: String,
    data_dir: String,
    sqlite_path: String,
    scripts: String,
    version_policy: VersionPolicy,
    #[serde(skip_serializing_if = "Option::is_none")]
    script_files: Option<Vec<String>>,
}

pub fn run(config: &WaybillConfig, args: ConfigArgs, output_format: OutputFormat) {
    let ConfigArgs { verbose } = args;

    let script_files = verbose.then(|| list_scripts(config));

    let info = ConfigInfo {
        config_file: WaybillConfig::config_file_path(),
        data_dir: config.data_dir.clone(),
        sqlite_path: config.sqlite_path().to_string_lossy().to_string(),
        scripts: config
            .scripts_dir
            .clone()
            .unwrap_or_else(|| "bundled".to_string()),
        version_policy: config.version_policy(),
        script_files,
    };

    if !print_json(&info, output_format) {
        print_config_table(&info, config);
    }
}

/// Script names from the configured directory, or the bundled versions
fn list_scripts(config: &WaybillConfig) -> Vec<String> {
    match &config.scripts_dir {
        Some(dir) => {
            let mut files: Vec<String> = std::fs::read_dir(dir)
                .map(|entries| {
                    entries
                        .flatten()
                        .map(|e| e.path())
                        .filter(|p| p.extension().is_some_and(|ext| ext == "sql"))
                        .map(|p| p.to_string_lossy().to_string())
                        .collect()
                })
                .unwrap_or_default();
            files.sort();
            files
        }
        None => EmbeddedScriptLoader::bundled()
            .versions()
            .map(|v| format!("(bundled) {}.sql", v))
            .collect(),
    }
}

fn print_config_table(info: &ConfigInfo, config: &WaybillConfig) {
    println!("Waybill Configuration");
    println!("=====================\n");

    println!("General:");
    println!("  Config file:    {}", info.config_file);
    println!(
        "  Status:         {}",
        if Path::new(&info.config_file).exists() {
            "exists"
        } else {
            "not created"
        }
    );
    println!();
    println!("{}", config.summary());

    if let Some(files) = &info.script_files {
        println!();
        println!("Migration Scripts:");
        if files.is_empty() {
            println!("  (none)");
        }
        for file in files {
            println!("  {}", file);
        }
    }

    eprintln!();
    eprintln!("Tips:");
    eprintln!("  Use --verbose (-v) to list migration scripts");
    eprintln!("  Use --format json for machine-readable output");
    eprintln!("  Edit ~/.waybill/waybill.toml to customize settings");
}
