// crates/truthcoin-cli/src/main.rs
//
// CLI entrypoint for the Truthcoin vote resolver.
//
// Resolves the built-in demo scenario, scenario files written in TOML, or
// ledger outcome records stored as JSON, and prints the results as tables
// or JSON.

mod commands;
mod config;
mod error;
mod output;

use clap::{Parser, Subcommand};
use commands::record::RecordCmd;
use commands::run::RunCmd;
use commands::ParamOverrides;
use output::OutputFormat;

/// Truthcoin vote resolver: weighted-PCA consensus over a vote matrix.
#[derive(Parser, Debug)]
#[command(
    name = "truthcoin-resolve",
    version = "0.1.0",
    about = "Resolve Truthcoin vote sessions and ledger outcome records"
)]
struct Cli {
    /// Output format: table or json.
    #[arg(long, global = true, value_enum, default_value = "table")]
    format: OutputFormat,

    /// Weight of this round's reputation in the smoothed reputation.
    #[arg(long, global = true)]
    alpha: Option<f64>,

    /// Width of the undecided band around 0.5 for binary decisions.
    #[arg(long, global = true)]
    tol: Option<f64>,

    /// Fail when the SVD does not converge instead of using the last iterate.
    #[arg(long, global = true)]
    strict: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level subcommands.
#[derive(Debug, Subcommand)]
enum Commands {
    /// Resolve the built-in six-voter scenario.
    Demo,

    /// Resolve a scenario TOML file.
    Run(RunCmd),

    /// Calculate a ledger outcome record stored as JSON.
    Record(RecordCmd),
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing subscriber for structured logging. Logs go to
    // stderr so JSON on stdout stays parseable.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let overrides = ParamOverrides {
        alpha: cli.alpha,
        tol: cli.tol,
        strict: cli.strict,
    };

    match &cli.command {
        Commands::Demo => commands::demo::run(cli.format, &overrides)?,
        Commands::Run(cmd) => commands::run::run(cmd, cli.format, &overrides)?,
        Commands::Record(cmd) => commands::record::run(cmd, cli.format, &overrides)?,
    }

    Ok(())
}
