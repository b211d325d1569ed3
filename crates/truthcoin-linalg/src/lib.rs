// crates/truthcoin-linalg/src/lib.rs
//
// truthcoin-linalg: dense matrices and the deterministic SVD used by
// Truthcoin vote resolution.
//
// This is the leaf crate of the workspace. Everything here is plain f64
// arithmetic with a fixed operation order, so two machines decomposing the
// same matrix produce bit-identical factors.

pub mod bidiag;
pub mod error;
pub mod matrix;
pub mod svd;

// Re-export key types for ergonomic access from downstream crates.
// Usage: `use truthcoin_linalg::{Matrix, svd};`

pub use bidiag::{bidiagonalize, Bidiagonal};
pub use error::LinalgError;
pub use matrix::Matrix;
pub use svd::{svd, svd_with, Svd, SvdOptions, ZeroDiagonal};
