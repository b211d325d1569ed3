// crates/truthcoin-cli/src/commands/run.rs
//
// `truthcoin-resolve run <scenario.toml>`: resolve a scenario file.

use clap::Args;
use tracing::info;

use crate::commands::{resolve_scenario, ParamOverrides};
use crate::config::Scenario;
use crate::output::OutputFormat;

/// Resolve a scenario file.
#[derive(Debug, Args)]
pub struct RunCmd {
    /// Path to the scenario TOML file.
    #[arg()]
    pub path: String,
}

/// Run the run command.
pub fn run(
    cmd: &RunCmd,
    format: OutputFormat,
    overrides: &ParamOverrides,
) -> Result<(), Box<dyn std::error::Error>> {
    let scenario = Scenario::load(&cmd.path)?;
    info!("Loaded scenario from {}", cmd.path);
    let report = resolve_scenario(&scenario, overrides)?;
    println!("{}", report.render(format));
    Ok(())
}
