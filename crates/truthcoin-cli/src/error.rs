// crates/truthcoin-cli/src/error.rs
//
// Errors raised while loading and resolving scenario files.

use thiserror::Error;
use truthcoin_consensus::ConsensusError;

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("Could not read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid scenario TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A vote that is neither a number in range nor `"NA"`.
    #[error("Invalid vote by {voter} on {decision}: {reason}")]
    InvalidVote {
        voter: String,
        decision: String,
        reason: String,
    },

    #[error("Invalid reputation {value} for {voter}")]
    InvalidReputation { voter: String, value: f64 },

    /// Voters, decisions and votes do not line up.
    #[error("Scenario shape error: {0}")]
    Shape(String),

    #[error(transparent)]
    Consensus(#[from] ConsensusError),
}
