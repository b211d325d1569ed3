// crates/truthcoin-linalg/src/error.rs
//
// Error type shared by every matrix operation and decomposition.

use thiserror::Error;

/// Errors produced by the dense linear algebra layer.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LinalgError {
    /// Operand shapes are incompatible for the requested operation.
    #[error("Dimension mismatch in {op}: {}x{} vs {}x{}", left.0, left.1, right.0, right.1)]
    DimensionMismatch {
        op: &'static str,
        left: (usize, usize),
        right: (usize, usize),
    },

    /// The input does not have a shape the operation accepts.
    #[error("Invalid shape: {0}")]
    InvalidShape(String),

    /// The SVD iteration budget ran out before the superdiagonal vanished.
    /// Only reported when strict convergence is requested.
    #[error("SVD did not converge after {iterations} iterations")]
    NonConvergence { iterations: usize },
}
