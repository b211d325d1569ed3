// crates/truthcoin-consensus/src/weights.rs
//
// Reputation-weighted column statistics for vote resolution.
//
// Every statistic here walks voters in index order and compares cells
// against the session's missing-value sentinel by exact equality.

use truthcoin_linalg::Matrix;

/// Replace every entry with `|x| / sum(|x|)`.
///
/// If the absolute values sum to zero the vector keeps its absolute values
/// and is not rescaled.
pub fn normalize(values: &mut [f64]) {
    let mut sum = 0.0;
    for v in values.iter_mut() {
        if *v < 0.0 {
            *v = -*v;
        }
        sum += *v;
    }
    if sum == 0.0 {
        return;
    }
    for v in values.iter_mut() {
        *v /= sum;
    }
}

/// Weighted mean of column `col`, skipping missing cells and voters with
/// non-positive weight.
///
/// Returns 0.0 when no weight is eligible or when the arguments do not line
/// up (`weights.len() != rows`, `col` out of range, empty matrix).
pub fn weighted_mean(weights: &[f64], m: &Matrix, col: usize, na: f64) -> f64 {
    if !column_in_shape(weights, m, col) {
        return 0.0;
    }
    let mut sum = 0.0;
    let mut sum_weights = 0.0;
    for (i, &w) in weights.iter().enumerate() {
        if w <= 0.0 {
            continue;
        }
        let v = m[(i, col)];
        if v == na {
            continue;
        }
        sum += w * v;
        sum_weights += w;
    }
    if sum_weights > 0.0 {
        sum / sum_weights
    } else {
        0.0
    }
}

/// Weighted median of column `col`, skipping missing cells.
///
/// Values are sorted ascending and walked from the smallest, accumulating
/// weight until half of the total is reached; the value where that happens
/// is returned as is. There is no interpolation between neighbours, and
/// non-positive weights are kept (they simply add nothing). Returns 0.0 when
/// the column has no present cell or the arguments do not line up.
pub fn weighted_median(weights: &[f64], m: &Matrix, col: usize, na: f64) -> f64 {
    if !column_in_shape(weights, m, col) {
        return 0.0;
    }

    let mut pairs: Vec<(f64, f64)> = Vec::with_capacity(weights.len());
    let mut total = 0.0;
    for (i, &w) in weights.iter().enumerate() {
        let v = m[(i, col)];
        if v == na {
            continue;
        }
        pairs.push((v, w));
        total += w;
    }
    if pairs.is_empty() {
        return 0.0;
    }
    let half = total / 2.0;

    pairs.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

    let mut median = pairs[0].0;
    let mut cumulative = pairs[0].1;
    for &(v, w) in &pairs[1..] {
        if cumulative >= half {
            break;
        }
        median = v;
        cumulative += w;
    }
    median
}

fn column_in_shape(weights: &[f64], m: &Matrix, col: usize) -> bool {
    m.rows() > 0 && m.cols() > 0 && weights.len() == m.rows() && col < m.cols()
}

#[cfg(test)]
mod tests {
    use super::*;

    const NA: f64 = 0.138042e-30;

    fn column(values: &[f64]) -> Matrix {
        Matrix::column_vector(values)
    }

    #[test]
    fn test_normalize_sums_to_one() {
        let mut v = vec![1.0, -3.0, 4.0];
        normalize(&mut v);
        assert_eq!(v, vec![0.125, 0.375, 0.5]);
        assert!(v.iter().all(|&x| x >= 0.0));
    }

    #[test]
    fn test_normalize_zero_vector_unchanged() {
        let mut v = vec![0.0, -0.0, 0.0];
        normalize(&mut v);
        assert!(v.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_weighted_mean() {
        let m = column(&[1.0, 0.0, 1.0, 0.5]);
        let w = [0.2, 0.3, 0.1, 0.4];
        let mean = weighted_mean(&w, &m, 0, NA);
        assert!((mean - 0.5).abs() < 1e-15);
    }

    #[test]
    fn test_weighted_mean_skips_missing_and_non_positive() {
        let m = column(&[1.0, NA, 0.0, 100.0]);
        let w = [0.25, 0.5, 0.25, 0.0];
        assert_eq!(weighted_mean(&w, &m, 0, NA), 0.5);
    }

    #[test]
    fn test_weighted_mean_no_eligible_weight() {
        let m = column(&[NA, 1.0]);
        assert_eq!(weighted_mean(&[0.5, 0.0], &m, 0, NA), 0.0);
    }

    #[test]
    fn test_weighted_mean_out_of_shape() {
        let m = column(&[1.0, 1.0]);
        assert_eq!(weighted_mean(&[0.5], &m, 0, NA), 0.0);
        assert_eq!(weighted_mean(&[0.5, 0.5], &m, 1, NA), 0.0);
        assert_eq!(weighted_mean(&[], &Matrix::new(0, 0), 0, NA), 0.0);
    }

    #[test]
    fn test_weighted_median_equal_weights() {
        let m = column(&[3.0, 1.0, 2.0]);
        let w = [1.0 / 3.0; 3];
        assert_eq!(weighted_median(&w, &m, 0, NA), 2.0);
    }

    #[test]
    fn test_weighted_median_heavy_voter_wins() {
        let m = column(&[0.1, 0.9, 0.5]);
        let w = [0.1, 0.7, 0.2];
        assert_eq!(weighted_median(&w, &m, 0, NA), 0.9);
    }

    #[test]
    fn test_weighted_median_does_not_interpolate() {
        let m = column(&[1.0, 2.0]);
        assert_eq!(weighted_median(&[0.5, 0.5], &m, 0, NA), 1.0);
    }

    #[test]
    fn test_weighted_median_skips_missing() {
        let m = column(&[NA, 5.0, NA, 7.0, 6.0]);
        let w = [0.9, 0.025, 0.025, 0.025, 0.025];
        assert_eq!(weighted_median(&w, &m, 0, NA), 6.0);
    }

    #[test]
    fn test_weighted_median_all_missing() {
        let m = column(&[NA, NA]);
        assert_eq!(weighted_median(&[0.5, 0.5], &m, 0, NA), 0.0);
    }

    #[test]
    fn test_statistics_on_second_column() {
        let m = Matrix::from_rows(&[vec![9.0, 0.0], vec![9.0, 1.0], vec![9.0, 1.0]]).unwrap();
        let w = [0.5, 0.25, 0.25];
        assert_eq!(weighted_mean(&w, &m, 1, NA), 0.5);
        assert_eq!(weighted_median(&w, &m, 1, NA), 0.0);
    }
}
