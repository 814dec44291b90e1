mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::EnvFilter;

use commands::model::ModelArgs;
use commands::scenarios::ScenariosArgs;
use commands::workbook::{AuditArgs, ExportArgs};

/// Venture cash-flow models with live spreadsheet export
#[derive(Parser)]
#[command(
    name = "cfm",
    version,
    about = "Venture cash-flow models with live spreadsheet export",
    long_about = "A CLI for building five-year venture cash-flow models with decimal \
                  precision. Projects FCFF, values it (exit multiple or Gordon growth), \
                  solves IRR, compares Base/Best/Worst scenarios and exports an xlsx \
                  workbook whose formulas reproduce the computed figures."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Engine configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Errors only
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the cash-flow model for one assumption set
    Model(ModelArgs),
    /// Run Base, Best and Worst scenarios
    Scenarios(ScenariosArgs),
    /// Export the model as an xlsx workbook
    Export(ExportArgs),
    /// Recalculate the workbook formulas and compare with the engine
    Audit(AuditArgs),
    /// Print the default assumption set
    Defaults,
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn setup_logging(verbose: bool, quiet: bool) {
    let level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

fn main() {
    let cli = Cli::parse();
    setup_logging(cli.verbose, cli.quiet);

    let config = match commands::load_config(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    };

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Model(args) => commands::model::run_model(args, &config),
        Commands::Scenarios(args) => commands::scenarios::run_scenarios(args, &config),
        Commands::Export(args) => commands::workbook::run_export(args, &config),
        Commands::Audit(args) => commands::workbook::run_audit(args, &config),
        Commands::Defaults => commands::model::run_defaults(),
        Commands::Version => {
            println!("cfm {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            if let Err(e) = output::format_output(&cli.output, &value) {
                eprintln!("{}: {}", "error".red().bold(), e);
                process::exit(1);
            }
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
