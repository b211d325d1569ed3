// crates/truthcoin-cli/src/commands/demo.rs
//
// `truthcoin-resolve demo`: resolve the built-in six-voter scenario.

use crate::commands::{resolve_scenario, ParamOverrides};
use crate::config::Scenario;
use crate::output::OutputFormat;

/// Six voters, four binary and two scaled decisions, two abstentions.
pub const DEMO_SCENARIO: &str = include_str!("../../demos/six_voters.toml");

/// Run the demo command.
pub fn run(format: OutputFormat, overrides: &ParamOverrides) -> Result<(), Box<dyn std::error::Error>> {
    let scenario = Scenario::from_toml_str(DEMO_SCENARIO)?;
    let report = resolve_scenario(&scenario, overrides)?;
    println!("{}", report.render(format));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_scenario_resolves() {
        let scenario = Scenario::from_toml_str(DEMO_SCENARIO).unwrap();
        assert_eq!(scenario.voters.len(), 6);
        assert_eq!(scenario.decisions.len(), 6);

        let report = resolve_scenario(&scenario, &ParamOverrides::default()).unwrap();
        assert!(report.svd_converged);

        let finals: Vec<f64> = report.decisions.iter().map(|d| d.final_outcome).collect();
        assert_eq!(&finals[..4], &[0.0, 0.0, 1.0, 1.0]);
        assert_eq!(report.decisions[4].outcome, 435.0);
        assert!((report.decisions[5].outcome - 19999.0).abs() < 1e-9);

        let total: f64 = report.voters.iter().map(|v| v.smoothed_rep).sum();
        assert!((total - 1.0).abs() < 1e-12);
        assert_eq!(report.voters[1].na_count, 1.0);
    }

    #[test]
    fn test_demo_alpha_override() {
        let scenario = Scenario::from_toml_str(DEMO_SCENARIO).unwrap();
        let overrides = ParamOverrides {
            alpha: Some(0.0),
            ..ParamOverrides::default()
        };
        let report = resolve_scenario(&scenario, &overrides).unwrap();
        assert_eq!(report.params.alpha, 0.0);
        // With no weight on this round, smoothed reputation is the prior.
        for voter in &report.voters {
            assert!((voter.smoothed_rep - voter.old_rep).abs() < 1e-15);
        }
    }
}
