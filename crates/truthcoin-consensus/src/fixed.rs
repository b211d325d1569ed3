// crates/truthcoin-consensus/src/fixed.rs
//
// Conversion between f64 and the ledger's fixed-point integers.
//
// Ledger state stores every real number as an integer count of 1e-8 units,
// the same scale as satoshis.

use crate::error::FixedPointError;

/// Number of fixed-point units per 1.0.
pub const FIXED_SCALE: f64 = 1e8;

/// Fixed-point integer to `f64`.
///
/// Multiplies by `1e-8` rather than dividing by [`FIXED_SCALE`]: the two
/// round differently (`3 * 1e-8 != 3 / 1e8`), and resolved outcomes must
/// match the bits every other node computes.
pub fn from_fixed(value: i64) -> f64 {
    value as f64 * 1e-8
}

/// `f64` to fixed-point integer, rounding half away from zero.
pub fn to_fixed(value: f64) -> Result<i64, FixedPointError> {
    if !value.is_finite() {
        return Err(FixedPointError::NonFinite(value));
    }
    let rounded = (value * FIXED_SCALE).round();
    if rounded >= i64::MAX as f64 || rounded < i64::MIN as f64 {
        return Err(FixedPointError::Overflow(value));
    }
    Ok(rounded as i64)
}

/// Convert a slice, stopping at the first failure.
pub fn to_fixed_vec(values: &[f64]) -> Result<Vec<i64>, FixedPointError> {
    values.iter().map(|&v| to_fixed(v)).collect()
}
