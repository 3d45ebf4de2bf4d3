use clap::Args;
use tabled::settings::Style;
use tabled::Table;
use waybill::migration::QuoteAwareSplitter;
use waybill::{MigrationPlan, Migrator, OutputFormat, WaybillConfig, WaybillDatabase};

use super::{print_json, script_loader};

/// Arguments for the Plan command
#[derive(Args)]
pub struct PlanArgs {
    /// Directory with <version>.sql scripts, overriding the configuration
    #[clap(long)]
    pub scripts_dir: Option<String>,

    /// Split statements with a quote- and comment-aware splitter
    #[clap(long)]
    pub quote_aware: bool,
}

pub fn run(config: &WaybillConfig, args: PlanArgs, output_format: OutputFormat) {
    let PlanArgs {
        scripts_dir,
        quote_aware,
    } = args;

    let db = WaybillDatabase::from_config(config);
    if !db.provider().exists() {
        eprintln!(
            "ERROR: No database at {} (run: waybill init)",
            db.path().display()
        );
        std::process::exit(1);
    }

    let loader = script_loader(config, scripts_dir);
    let migrator = Migrator::new(db.provider(), loader.as_ref());
    let plan = if quote_aware {
        migrator.with_splitter(QuoteAwareSplitter).plan()
    } else {
        migrator.plan()
    };

    let plan = match plan {
        Ok(plan) => plan,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            std::process::exit(1);
        }
    };

    if !print_json(&plan, output_format) {
        print_plan(&plan, output_format);
    }
}

fn print_plan(plan: &MigrationPlan, output_format: OutputFormat) {
    if plan.is_up_to_date() {
        println!(
            "Schema at v{} (target v{}), nothing to migrate",
            plan.from_version, plan.target_version
        );
        return;
    }

    println!(
        "Migration v{} -> v{}: {} transactional, {} drop",
        plan.from_version,
        plan.target_version,
        plan.batch.transactional.len(),
        plan.batch.drops.len()
    );

    if plan.batch.is_empty() {
        println!("No scripts found in range; only the version record would change");
        return;
    }

    // drops run after the whole transactional batch, so list them in execution order
    let ordered = plan
        .batch
        .transactional
        .iter()
        .chain(plan.batch.drops.iter());
    match output_format {
        OutputFormat::Markdown => println!("{}", Table::new(ordered).with(Style::markdown())),
        _ => println!("{}", Table::new(ordered).with(Style::rounded())),
    }
}
