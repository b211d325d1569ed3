// crates/truthcoin-consensus/src/error.rs
//
// Error types for vote resolution and fixed-point conversion.

use thiserror::Error;
use truthcoin_linalg::LinalgError;

/// Errors produced while resolving a vote session.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConsensusError {
    /// Prior reputations average to zero, so nothing can be weighted.
    #[error("Prior reputation has zero total weight")]
    ZeroWeight,

    /// Session inputs disagree on the number of voters or decisions.
    #[error("Invalid shape: {0}")]
    InvalidShape(String),

    /// Failure inside the matrix layer (including strict SVD non-convergence).
    #[error("Linear algebra error: {0}")]
    Linalg(#[from] LinalgError),

    /// A value could not cross the fixed-point ledger boundary.
    #[error("Fixed-point error: {0}")]
    FixedPoint(#[from] FixedPointError),
}

/// Errors converting between `f64` and the ledger's 1e-8 fixed-point integers.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FixedPointError {
    #[error("Non-finite value: {0}")]
    NonFinite(f64),
    #[error("Value exceeds the fixed-point range: {0}")]
    Overflow(f64),
    #[error("Negative value not allowed: {0}")]
    Negative(i64),
}
