// crates/truthcoin-consensus/src/params.rs
//
// Tunable parameters of a single resolution.

use serde::{Deserialize, Serialize};
use truthcoin_linalg::{SvdOptions, ZeroDiagonal};

/// Default missing-value sentinel used by the ledger.
pub const DEFAULT_NA: f64 = 0.138042e-30;

/// Parameters carried by every vote session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResolutionParams {
    /// Sentinel marking a missing vote. Compared by exact equality.
    #[serde(default = "default_na")]
    pub na: f64,

    /// Weight of this round's reputation in the smoothed reputation.
    #[serde(default = "default_alpha")]
    pub alpha: f64,

    /// Width of the undecided band around 0.5 for binary decisions.
    #[serde(default = "default_tol")]
    pub tol: f64,

    /// Fail instead of resolving with an unconverged SVD.
    #[serde(default)]
    pub strict_convergence: bool,
}

fn default_na() -> f64 {
    DEFAULT_NA
}

fn default_alpha() -> f64 {
    0.10
}

fn default_tol() -> f64 {
    0.10
}

impl Default for ResolutionParams {
    fn default() -> Self {
        Self {
            na: default_na(),
            alpha: default_alpha(),
            tol: default_tol(),
            strict_convergence: false,
        }
    }
}

impl ResolutionParams {
    /// SVD options implied by these parameters.
    pub fn svd_options(&self) -> SvdOptions {
        SvdOptions {
            strict: self.strict_convergence,
            zero_diagonal: ZeroDiagonal::Consensus,
            ..SvdOptions::default()
        }
    }
}
