// crates/truthcoin-cli/src/commands/record.rs
//
// `truthcoin-resolve record <outcome.json>`: calculate a ledger outcome
// record and print the filled-in record.

use std::fs;

use clap::Args;
use tracing::info;
use truthcoin_consensus::fixed::to_fixed;
use truthcoin_consensus::{ConsensusError, OutcomeRecord};

use crate::commands::ParamOverrides;
use crate::error::ScenarioError;
use crate::output::{format_json, OutputFormat};

/// Calculate an outcome record.
#[derive(Debug, Args)]
pub struct RecordCmd {
    /// Path to the outcome record JSON file.
    #[arg()]
    pub path: String,

    /// Also write the calculated record as JSON to this path.
    #[arg(long)]
    pub output: Option<String>,
}

fn read_file(path: &str) -> Result<String, ScenarioError> {
    fs::read_to_string(path).map_err(|source| ScenarioError::Io {
        path: path.to_string(),
        source,
    })
}

/// Load a record from a JSON file.
pub fn load_record(path: &str) -> Result<OutcomeRecord, ScenarioError> {
    let contents = read_file(path)?;
    let record: OutcomeRecord = serde_json::from_str(&contents)?;
    Ok(record)
}

/// Overwrite the record's fixed-point alpha and tol with command-line values.
pub fn apply_overrides(
    record: &mut OutcomeRecord,
    overrides: &ParamOverrides,
) -> Result<(), ScenarioError> {
    if let Some(alpha) = overrides.alpha {
        record.alpha = to_fixed(alpha).map_err(ConsensusError::from)?;
    }
    if let Some(tol) = overrides.tol {
        record.tol = to_fixed(tol).map_err(ConsensusError::from)?;
    }
    Ok(())
}

/// Load, override and calculate the record at `path`.
pub fn calc_record(path: &str, overrides: &ParamOverrides) -> Result<OutcomeRecord, ScenarioError> {
    let mut record = load_record(path)?;
    apply_overrides(&mut record, overrides)?;
    record.calc_with(overrides.strict)?;
    Ok(record)
}

/// Run the record command.
pub fn run(
    cmd: &RecordCmd,
    format: OutputFormat,
    overrides: &ParamOverrides,
) -> Result<(), Box<dyn std::error::Error>> {
    let record = calc_record(&cmd.path, overrides)?;

    if let Some(output) = &cmd.output {
        let json = serde_json::to_string_pretty(&record)?;
        fs::write(output, json).map_err(|source| ScenarioError::Io {
            path: output.clone(),
            source,
        })?;
        info!("Wrote calculated record to {}", output);
    }

    match format {
        OutputFormat::Table => println!("{}", record),
        OutputFormat::Json => println!("{}", format_json(&record)),
    }
    Ok(())
}
