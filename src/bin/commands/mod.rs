use serde::Serialize;
use waybill::migration::{DirScriptLoader, EmbeddedScriptLoader, ScriptLoader};
use waybill::{OutputFormat, WaybillConfig};

pub mod config;
pub mod init;
pub mod migrate;
pub mod plan;
pub mod status;

/// Script source for a command: `--scripts-dir`, then the config, then the bundled scripts
pub(crate) fn script_loader(
    config: &WaybillConfig,
    scripts_dir: Option<String>,
) -> Box<dyn ScriptLoader> {
    match scripts_dir.or_else(|| config.scripts_dir.clone()) {
        Some(dir) => Box::new(DirScriptLoader::new(dir)),
        None => Box::new(EmbeddedScriptLoader::bundled()),
    }
}

/// Print `value` as JSON if the format asks for it; returns `false` for table formats
pub(crate) fn print_json<T: Serialize>(value: &T, output_format: OutputFormat) -> bool {
    match output_format.render_json(value) {
        Some(Ok(json)) => {
            println!("{}", json);
            true
        }
        Some(Err(e)) => {
            eprintln!("ERROR: Failed to serialize to JSON: {}", e);
            true
        }
        None => false,
    }
}

/// Format an optional unix timestamp for display
pub(crate) fn format_timestamp(ts: Option<i64>) -> String {
    ts.and_then(|t| chrono::DateTime::from_timestamp(t, 0))
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "-".to_string())
}
