// crates/truthcoin-cli/src/commands/mod.rs
//
// Command module declarations for the resolver, plus the parameter
// overrides and scenario resolution they share.

pub mod demo;
pub mod record;
pub mod run;

use tracing::{info, warn};
use truthcoin_consensus::ResolutionParams;

use crate::config::Scenario;
use crate::error::ScenarioError;
use crate::output::ResolutionReport;

/// Parameter values given on the command line. They win over file values.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ParamOverrides {
    pub alpha: Option<f64>,
    pub tol: Option<f64>,
    pub strict: bool,
}

impl ParamOverrides {
    pub fn apply(&self, params: &mut ResolutionParams) {
        if let Some(alpha) = self.alpha {
            params.alpha = alpha;
        }
        if let Some(tol) = self.tol {
            params.tol = tol;
        }
        if self.strict {
            params.strict_convergence = true;
        }
    }
}

/// Resolve `scenario` under its own parameters and `overrides`.
pub fn resolve_scenario(
    scenario: &Scenario,
    overrides: &ParamOverrides,
) -> Result<ResolutionReport, ScenarioError> {
    let mut params = scenario.params();
    overrides.apply(&mut params);

    let mut session = scenario.to_session(params)?;
    let outcome = session.resolve()?;
    if !outcome.svd_converged {
        warn!("SVD did not converge; outcomes come from the last iterate");
    }
    info!(
        voters = scenario.voters.len(),
        decisions = scenario.decisions.len(),
        alpha = params.alpha,
        tol = params.tol,
        "Resolved scenario"
    );

    Ok(ResolutionReport::new(scenario, params, outcome))
}
