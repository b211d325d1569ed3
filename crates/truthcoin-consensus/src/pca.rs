// crates/truthcoin-consensus/src/pca.rs
//
// Weighted principal component of a filled vote matrix.
//
// The covariance is reputation weighted and its first left singular vector
// is the loading that separates the voters. Scores are each voter's
// projection onto that loading.

use tracing::debug;
use truthcoin_linalg::{svd_with, Matrix, SvdOptions};

use crate::error::ConsensusError;

/// First principal component of a weighted vote matrix.
#[derive(Debug, Clone)]
pub struct PrincipalComponent {
    /// One entry per decision. Carries the sign the SVD produced; it is
    /// never flipped to a canonical orientation, because resolution decides
    /// which side of the scores wins from it.
    pub loading: Vec<f64>,
    /// One entry per voter.
    pub scores: Vec<f64>,
    /// Whether the underlying SVD converged inside its budget.
    pub converged: bool,
}

/// Compute the weighted first principal component of `m`.
///
/// # Arguments
/// * `weights` - One weight per row of `m`, expected to sum to 1.0.
/// * `m` - Vote matrix without missing cells.
/// * `options` - Passed through to the SVD.
pub fn weighted_principal_component(
    weights: &[f64],
    m: &Matrix,
    options: SvdOptions,
) -> Result<PrincipalComponent, ConsensusError> {
    let (rows, cols) = m.shape();
    if rows <= 1 {
        return Err(ConsensusError::InvalidShape(format!(
            "principal component needs at least two voters, got {}",
            rows
        )));
    }
    if weights.len() != rows {
        return Err(ConsensusError::InvalidShape(format!(
            "{} weights for {} voters",
            weights.len(),
            rows
        )));
    }

    // Step 1: Center each column on its weighted average
    let mut x = Matrix::new(rows, cols);
    for j in 0..cols {
        let mut avg = 0.0;
        for (i, &w) in weights.iter().enumerate() {
            avg += w * m[(i, j)];
        }
        for i in 0..rows {
            x[(i, j)] = m[(i, j)] - avg;
        }
    }

    // Step 2: Weighted covariance, lower triangle mirrored
    let mut weights_sq = 0.0;
    for &w in weights {
        weights_sq += w * w;
    }
    let factor = 1.0 / (1.0 - weights_sq);
    let mut covariance = Matrix::new(cols, cols);
    for i in 0..cols {
        for j in 0..=i {
            let mut sum = 0.0;
            for (k, &w) in weights.iter().enumerate() {
                sum += w * x[(k, i)] * x[(k, j)];
            }
            covariance[(i, j)] = factor * sum;
            covariance[(j, i)] = factor * sum;
        }
    }

    // Step 3: Loading is the first left singular vector
    let decomposition = svd_with(&covariance, options)?;
    let loading = decomposition.u.column(0);

    // Step 4: Project the centered votes
    let scores = x.mul(&Matrix::column_vector(&loading))?.column(0);

    debug!(
        voters = rows,
        decisions = cols,
        top_singular_value = decomposition.d[(0, 0)],
        "Computed weighted principal component"
    );

    Ok(PrincipalComponent {
        loading,
        scores,
        converged: decomposition.converged,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_single_voter() {
        let m = Matrix::from_rows(&[vec![1.0, 0.0]]).unwrap();
        let err = weighted_principal_component(&[1.0], &m, SvdOptions::default()).unwrap_err();
        assert!(matches!(err, ConsensusError::InvalidShape(_)));
    }

    #[test]
    fn test_rejects_weight_length_mismatch() {
        let m = Matrix::new(3, 2);
        let err = weighted_principal_component(&[0.5, 0.5], &m, SvdOptions::default()).unwrap_err();
        assert!(matches!(err, ConsensusError::InvalidShape(_)));
    }

    #[test]
    fn test_two_camps_split_along_loading() {
        let m = Matrix::from_rows(&[
            vec![1.0, 1.0, 0.0],
            vec![1.0, 1.0, 0.0],
            vec![0.0, 0.0, 1.0],
            vec![0.0, 0.0, 1.0],
        ])
        .unwrap();
        let w = [0.25; 4];
        let pc = weighted_principal_component(&w, &m, SvdOptions::default()).unwrap();
        assert!(pc.converged);
        assert_eq!(pc.loading.len(), 3);
        assert_eq!(pc.scores.len(), 4);

        let norm: f64 = pc.loading.iter().map(|x| x * x).sum();
        assert!((norm - 1.0).abs() < 1e-12);

        // Same-camp voters share a score; the camps sit on opposite sides.
        assert!((pc.scores[0] - pc.scores[1]).abs() < 1e-12);
        assert!((pc.scores[2] - pc.scores[3]).abs() < 1e-12);
        assert!(pc.scores[0] * pc.scores[2] < 0.0);
    }

    #[test]
    fn test_scores_are_weighted_centered() {
        let m = Matrix::from_rows(&[
            vec![1.0, 0.2],
            vec![0.0, 0.9],
            vec![1.0, 0.4],
            vec![0.5, 0.5],
        ])
        .unwrap();
        let w = [0.4, 0.3, 0.2, 0.1];
        let pc = weighted_principal_component(&w, &m, SvdOptions::default()).unwrap();
        let weighted_sum: f64 = pc.scores.iter().zip(&w).map(|(s, w)| s * w).sum();
        assert!(weighted_sum.abs() < 1e-12);
    }

    #[test]
    fn test_loading_keeps_the_decomposition_sign() {
        let m = Matrix::from_rows(&[
            vec![1.0, 0.2],
            vec![0.0, 0.9],
            vec![1.0, 0.4],
            vec![0.5, 0.5],
        ])
        .unwrap();
        let w = [0.4, 0.3, 0.2, 0.1];
        let pc = weighted_principal_component(&w, &m, SvdOptions::default()).unwrap();
        assert_eq!(pc.loading[0].to_bits(), 0x3feaf20a505e59b0);
        assert_eq!(pc.loading[1].to_bits(), 0xbfe142d001f45946);
        assert!(pc.scores[0] > 0.0);
        assert!(pc.scores[1] < 0.0);
    }
}
