// crates/truthcoin-cli/src/config.rs
//
// Scenario files for the resolver.
//
// A scenario is a TOML file listing decisions, voters with their prior
// reputation and votes, and the resolution parameters. Missing fields take
// the ledger defaults.

use std::fs;

use serde::Deserialize;
use truthcoin_consensus::params::DEFAULT_NA;
use truthcoin_consensus::{DecisionKind, ResolutionParams, VoteSession};

use crate::error::ScenarioError;

/// Marker for a missing vote in scenario files.
pub const MISSING_VOTE: &str = "NA";

/// A full resolution scenario.
#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    /// Weight of this round's reputation in the smoothed reputation.
    #[serde(default = "default_alpha")]
    pub alpha: f64,

    /// Width of the undecided band for binary decisions.
    #[serde(default = "default_tol")]
    pub tol: f64,

    /// Internal missing-value sentinel. Votes may not equal it.
    #[serde(default = "default_na")]
    pub na: f64,

    /// Fail instead of resolving with an unconverged SVD.
    #[serde(default)]
    pub strict_convergence: bool,

    #[serde(default, rename = "decision")]
    pub decisions: Vec<DecisionConfig>,

    #[serde(default, rename = "voter")]
    pub voters: Vec<VoterConfig>,
}

fn default_alpha() -> f64 {
    ResolutionParams::default().alpha
}

fn default_tol() -> f64 {
    ResolutionParams::default().tol
}

fn default_na() -> f64 {
    DEFAULT_NA
}

fn default_min() -> f64 {
    0.0
}

fn default_max() -> f64 {
    1.0
}

/// One decision column.
#[derive(Debug, Clone, Deserialize)]
pub struct DecisionConfig {
    pub name: String,

    /// Scaled decisions resolve to a weighted median instead of 0 / 0.5 / 1.
    #[serde(default)]
    pub scaled: bool,

    /// Lower end of a scaled decision's range. Votes are mapped to [0, 1].
    #[serde(default = "default_min")]
    pub min: f64,

    /// Upper end of a scaled decision's range.
    #[serde(default = "default_max")]
    pub max: f64,
}

impl DecisionConfig {
    pub fn kind(&self) -> DecisionKind {
        if self.scaled {
            DecisionKind::Scaled
        } else {
            DecisionKind::Binary
        }
    }

    /// Map a vote in the decision's own units into [0, 1].
    pub fn normalize(&self, value: f64) -> f64 {
        if self.scaled {
            (value - self.min) / (self.max - self.min)
        } else {
            value
        }
    }

    /// Map a resolved value in [0, 1] back into the decision's units.
    pub fn denormalize(&self, value: f64) -> f64 {
        if self.scaled {
            self.min + value * (self.max - self.min)
        } else {
            value
        }
    }
}

/// One voter row.
#[derive(Debug, Clone, Deserialize)]
pub struct VoterConfig {
    pub name: String,
    pub reputation: f64,
    #[serde(default)]
    pub votes: Vec<Vote>,
}

/// A single vote: a number, or the string `"NA"` when the voter abstained.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Vote {
    Value(f64),
    Text(String),
}

impl Scenario {
    /// Load a scenario from a TOML file.
    pub fn load(path: &str) -> Result<Self, ScenarioError> {
        let contents = fs::read_to_string(path).map_err(|source| ScenarioError::Io {
            path: path.to_string(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ScenarioError> {
        let scenario: Scenario = toml::from_str(contents)?;
        Ok(scenario)
    }

    /// Resolution parameters named in the file.
    pub fn params(&self) -> ResolutionParams {
        ResolutionParams {
            na: self.na,
            alpha: self.alpha,
            tol: self.tol,
            strict_convergence: self.strict_convergence,
        }
    }

    /// Build a vote session with `params`, validating every vote.
    pub fn to_session(&self, params: ResolutionParams) -> Result<VoteSession, ScenarioError> {
        self.check_shape()?;

        let mut session = VoteSession::new(self.voters.len(), self.decisions.len(), params);
        for (j, decision) in self.decisions.iter().enumerate() {
            session.set_kind(j, decision.kind())?;
        }

        for (i, voter) in self.voters.iter().enumerate() {
            if !voter.reputation.is_finite() || voter.reputation < 0.0 {
                return Err(ScenarioError::InvalidReputation {
                    voter: voter.name.clone(),
                    value: voter.reputation,
                });
            }
            session.set_old_rep(i, voter.reputation)?;

            for (j, (vote, decision)) in voter.votes.iter().zip(&self.decisions).enumerate() {
                let invalid = |reason: String| ScenarioError::InvalidVote {
                    voter: voter.name.clone(),
                    decision: decision.name.clone(),
                    reason,
                };
                match vote {
                    Vote::Text(text) if text == MISSING_VOTE => session.set_missing(i, j)?,
                    Vote::Text(text) => {
                        return Err(invalid(format!("expected a number or \"NA\", got {:?}", text)));
                    }
                    Vote::Value(raw) => {
                        let value = decision.normalize(*raw);
                        if !(0.0..=1.0).contains(&value) {
                            return Err(invalid(format!("{} is outside the decision's range", raw)));
                        }
                        if value == params.na {
                            return Err(invalid(format!(
                                "{} collides with the missing-value sentinel",
                                raw
                            )));
                        }
                        session.set_vote(i, j, value)?;
                    }
                }
            }
        }

        Ok(session)
    }

    fn check_shape(&self) -> Result<(), ScenarioError> {
        if self.decisions.is_empty() {
            return Err(ScenarioError::Shape("no decisions".to_string()));
        }
        if self.voters.len() < 2 {
            return Err(ScenarioError::Shape(format!(
                "{} voter(s), at least 2 are needed",
                self.voters.len()
            )));
        }
        for decision in &self.decisions {
            if decision.scaled && !(decision.max > decision.min) {
                return Err(ScenarioError::Shape(format!(
                    "decision {} has an empty range [{}, {}]",
                    decision.name, decision.min, decision.max
                )));
            }
        }
        for voter in &self.voters {
            if voter.votes.len() != self.decisions.len() {
                return Err(ScenarioError::Shape(format!(
                    "voter {} cast {} votes for {} decisions",
                    voter.name,
                    voter.votes.len(),
                    self.decisions.len()
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SMALL: &str = r#"
alpha = 0.2

[[decision]]
name = "rain"

[[decision]]
name = "price"
scaled = true
min = 100
max = 200

[[voter]]
name = "alice"
reputation = 0.5
votes = [1, 150]

[[voter]]
name = "bob"
reputation = 0.5
votes = [0, "NA"]
"#;

    #[test]
    fn test_defaults_and_overrides() {
        let scenario = Scenario::from_toml_str(SMALL).unwrap();
        assert_eq!(scenario.alpha, 0.2);
        assert_eq!(scenario.tol, 0.10);
        assert_eq!(scenario.na, DEFAULT_NA);
        assert!(!scenario.strict_convergence);
        assert_eq!(scenario.decisions.len(), 2);
        assert_eq!(scenario.voters[1].votes[1], Vote::Text("NA".to_string()));
    }

    #[test]
    fn test_to_session_maps_scaled_votes() {
        let scenario = Scenario::from_toml_str(SMALL).unwrap();
        let session = scenario.to_session(scenario.params()).unwrap();
        assert_eq!(session.kinds(), &[DecisionKind::Binary, DecisionKind::Scaled]);
        assert_eq!(session.vote(0, 1), Some(0.5));
        assert!(session.is_missing(1, 1));
        assert_eq!(session.old_rep(), &[0.5, 0.5]);
    }

    #[test]
    fn test_denormalize_inverts_normalize() {
        let scenario = Scenario::from_toml_str(SMALL).unwrap();
        let price = &scenario.decisions[1];
        assert_eq!(price.denormalize(price.normalize(175.0)), 175.0);
        let rain = &scenario.decisions[0];
        assert_eq!(rain.normalize(0.5), 0.5);
    }

    #[test]
    fn test_ragged_votes_rejected() {
        let mut scenario = Scenario::from_toml_str(SMALL).unwrap();
        scenario.voters[0].votes.pop();
        let err = scenario.to_session(scenario.params()).unwrap_err();
        assert!(matches!(err, ScenarioError::Shape(_)));
    }

    #[test]
    fn test_unknown_text_vote_rejected() {
        let mut scenario = Scenario::from_toml_str(SMALL).unwrap();
        scenario.voters[0].votes[0] = Vote::Text("yes".to_string());
        let err = scenario.to_session(scenario.params()).unwrap_err();
        assert!(matches!(err, ScenarioError::InvalidVote { .. }));
    }

    #[test]
    fn test_out_of_range_vote_rejected() {
        let mut scenario = Scenario::from_toml_str(SMALL).unwrap();
        scenario.voters[0].votes[1] = Vote::Value(250.0);
        let err = scenario.to_session(scenario.params()).unwrap_err();
        assert!(matches!(err, ScenarioError::InvalidVote { .. }));
    }

    #[test]
    fn test_negative_reputation_rejected() {
        let mut scenario = Scenario::from_toml_str(SMALL).unwrap();
        scenario.voters[1].reputation = -0.1;
        let err = scenario.to_session(scenario.params()).unwrap_err();
        assert!(matches!(err, ScenarioError::InvalidReputation { .. }));
    }

    #[test]
    fn test_empty_scaled_range_rejected() {
        let mut scenario = Scenario::from_toml_str(SMALL).unwrap();
        scenario.decisions[1].max = 100.0;
        let err = scenario.to_session(scenario.params()).unwrap_err();
        assert!(matches!(err, ScenarioError::Shape(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SMALL.as_bytes()).unwrap();
        let path = file.path().to_str().unwrap().to_string();
        let scenario = Scenario::load(&path).unwrap();
        assert_eq!(scenario.voters.len(), 2);
    }

    #[test]
    fn test_load_missing_file() {
        let err = Scenario::load("/nonexistent/scenario.toml").unwrap_err();
        assert!(matches!(err, ScenarioError::Io { .. }));
    }

    #[test]
    fn test_bad_toml() {
        let err = Scenario::from_toml_str("alpha = ").unwrap_err();
        assert!(matches!(err, ScenarioError::Toml(_)));
    }
}
