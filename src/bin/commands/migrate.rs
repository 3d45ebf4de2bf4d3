use clap::Args;
use tabled::settings::Style;
use tabled::{Table, Tabled};
use waybill::migration::QuoteAwareSplitter;
use waybill::{
    MigrationReport, Migrator, OutputFormat, VersionPolicy, WaybillConfig, WaybillDatabase,
};

use super::{print_json, script_loader};

/// Arguments for the Migrate command
#[derive(Args)]
pub struct MigrateArgs {
    /// Directory with <version>.sql scripts, overriding the configuration
    #[clap(long)]
    pub scripts_dir: Option<String>,

    /// Do not record the new schema version (the same range is applied again next time)
    #[clap(long)]
    pub no_persist: bool,

    /// Split statements with a quote- and comment-aware splitter
    #[clap(long)]
    pub quote_aware: bool,
}

#[derive(Tabled)]
struct DropFailureRow {
    #[tabled(rename = "Drop Failure")]
    failure: String,
}

pub fn run(config: &WaybillConfig, args: MigrateArgs, output_format: OutputFormat) {
    let MigrateArgs {
        scripts_dir,
        no_persist,
        quote_aware,
    } = args;

    let db = WaybillDatabase::from_config(config);
    if let Err(e) = db.bootstrap() {
        eprintln!("ERROR: Failed to initialize database: {}", e);
        std::process::exit(1);
    }

    let policy = if no_persist {
        VersionPolicy::ReapplyEveryBoot
    } else {
        config.version_policy()
    };
    let loader = script_loader(config, scripts_dir);

    let migrator = Migrator::new(db.provider(), loader.as_ref()).with_policy(policy);
    let report = if quote_aware {
        migrator.with_splitter(QuoteAwareSplitter).run()
    } else {
        migrator.run()
    };

    if !print_json(&report, output_format) {
        print_report(&report, output_format);
    }

    if !report.succeeded() {
        std::process::exit(1);
    }
}

fn print_report(report: &MigrationReport, output_format: OutputFormat) {
    let from = report
        .from_version
        .map(|v| format!("v{}", v))
        .unwrap_or_else(|| "unknown".to_string());

    println!("Migration: {}", report.state);
    println!("  From:           {}", from);
    println!("  Target:         v{}", report.target_version);
    println!("  Statements:     {}", report.statement_count);
    println!("  Transactional:  {} applied", report.transactional_applied);
    println!(
        "  Drops:          {} applied, {} failed",
        report.drops_applied,
        report.drop_failures.len()
    );
    println!(
        "  Duration:       {} ms",
        (report.finished_at - report.started_at).num_milliseconds()
    );

    if let Some(e) = &report.error {
        println!();
        println!("Halted: {}", e);
    }
    if let Some(e) = &report.persist_error {
        println!();
        println!("Version not recorded: {}", e);
    }

    if !report.drop_failures.is_empty() {
        let rows: Vec<DropFailureRow> = report
            .drop_failures
            .iter()
            .map(|e| DropFailureRow {
                failure: e.to_string(),
            })
            .collect();
        println!();
        match output_format {
            OutputFormat::Markdown => println!("{}", Table::new(rows).with(Style::markdown())),
            _ => println!("{}", Table::new(rows).with(Style::rounded())),
        }
    }
}
