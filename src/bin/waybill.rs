use clap::{Parser, Subcommand};
use tracing::Level;
use waybill::{OutputFormat, WaybillConfig};

mod commands;

use commands::config::ConfigArgs;
use commands::init::InitArgs;
use commands::migrate::MigrateArgs;
use commands::plan::PlanArgs;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
#[clap(propagate_version = true)]
struct Cli {
    /// configuration file path, by default $HOME/.waybill/waybill.toml is used
    #[clap(short, long)]
    config: Option<String>,

    /// Print debug information
    #[clap(long)]
    debug: bool,

    /// Output format: table, markdown, json, json-pretty
    #[clap(short, long, global = true, default_value = "table")]
    format: OutputFormat,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create and initialize the database if it does not exist yet
    Init(InitArgs),

    /// Bring the database up to this build's schema version
    Migrate(MigrateArgs),

    /// Show the statements a migration would apply, without running them
    Plan(PlanArgs),

    /// Show the schema version and status of the database
    Status,

    /// Show the active configuration
    Config(ConfigArgs),
}

fn main() {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    if cli.debug {
        tracing_subscriber::fmt()
            // filter spans/events with level DEBUG or higher.
            .with_max_level(Level::DEBUG)
            .init();
    }

    let config = match WaybillConfig::new(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            std::process::exit(1);
        }
    };

    match cli.command {
        Commands::Init(args) => commands::init::run(&config, args, cli.format),
        Commands::Migrate(args) => commands::migrate::run(&config, args, cli.format),
        Commands::Plan(args) => commands::plan::run(&config, args, cli.format),
        Commands::Status => commands::status::run(&config, cli.format),
        Commands::Config(args) => commands::config::run(&config, args, cli.format),
    }
}
