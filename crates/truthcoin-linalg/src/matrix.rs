// crates/truthcoin-linalg/src/matrix.rs
//
// Dense, owned, row-major matrix of f64 values.
//
// Every arithmetic operation that combines two matrices checks shapes first
// and returns a fresh matrix, so a result can never alias one of its inputs.
// Products sum the inner dimension in ascending order starting from 0.0;
// the resolution engine relies on that order being fixed.

use std::fmt;
use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};

use crate::error::LinalgError;

/// A dense `rows x cols` matrix stored row by row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "Vec<Vec<f64>>", try_from = "Vec<Vec<f64>>")]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl Matrix {
    /// Create a zero-filled matrix.
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    /// Create an `n x n` identity matrix.
    pub fn identity(n: usize) -> Self {
        let mut m = Self::new(n, n);
        m.set_identity();
        m
    }

    /// Build a matrix from a slice of rows. Every row must have the same length.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self, LinalgError> {
        let cols = rows.first().map_or(0, |r| r.len());
        let mut data = Vec::with_capacity(rows.len() * cols);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != cols {
                return Err(LinalgError::InvalidShape(format!(
                    "row {} has {} columns, expected {}",
                    i,
                    row.len(),
                    cols
                )));
            }
            data.extend_from_slice(row);
        }
        Ok(Self {
            rows: rows.len(),
            cols,
            data,
        })
    }

    /// An `n x 1` matrix holding `values`.
    pub fn column_vector(values: &[f64]) -> Self {
        Self {
            rows: values.len(),
            cols: 1,
            data: values.to_vec(),
        }
    }

    /// A `1 x n` matrix holding `values`.
    pub fn row_vector(values: &[f64]) -> Self {
        Self {
            rows: 1,
            cols: values.len(),
            data: values.to_vec(),
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// `(rows, cols)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Row-major view of every element.
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Bounds-checked element read.
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        if row < self.rows && col < self.cols {
            Some(self.data[row * self.cols + col])
        } else {
            None
        }
    }

    /// Borrow row `i`.
    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.cols..(i + 1) * self.cols]
    }

    /// Mutably borrow row `i`.
    pub fn row_mut(&mut self, i: usize) -> &mut [f64] {
        &mut self.data[i * self.cols..(i + 1) * self.cols]
    }

    /// Copy column `j` out into a vector.
    pub fn column(&self, j: usize) -> Vec<f64> {
        (0..self.rows).map(|i| self[(i, j)]).collect()
    }

    /// Change the shape. Contents are discarded (zero-filled) unless the
    /// shape is unchanged, in which case this is a no-op.
    pub fn resize(&mut self, rows: usize, cols: usize) {
        if self.rows == rows && self.cols == cols {
            return;
        }
        *self = Self::new(rows, cols);
    }

    /// Overwrite `self` with a copy of `other`, adopting its shape.
    pub fn copy_from(&mut self, other: &Matrix) {
        self.resize(other.rows, other.cols);
        self.data.copy_from_slice(&other.data);
    }

    /// Overwrite with ones on the diagonal and zeros elsewhere. Works on
    /// rectangular matrices too.
    pub fn set_identity(&mut self) {
        for i in 0..self.rows {
            for j in 0..self.cols {
                self[(i, j)] = if i == j { 1.0 } else { 0.0 };
            }
        }
    }

    /// Return the transpose.
    pub fn transpose(&self) -> Matrix {
        let mut out = Matrix::new(self.cols, self.rows);
        for i in 0..self.rows {
            for j in 0..self.cols {
                out[(j, i)] = self[(i, j)];
            }
        }
        out
    }

    /// Transpose in place, going through a temporary.
    pub fn transpose_in_place(&mut self) {
        let t = self.transpose();
        *self = t;
    }

    /// Element-wise sum.
    pub fn add(&self, rhs: &Matrix) -> Result<Matrix, LinalgError> {
        self.check_same_shape("add", rhs)?;
        let data = self
            .data
            .iter()
            .zip(&rhs.data)
            .map(|(a, b)| a + b)
            .collect();
        Ok(Matrix {
            rows: self.rows,
            cols: self.cols,
            data,
        })
    }

    /// Element-wise difference `self - rhs`.
    pub fn sub(&self, rhs: &Matrix) -> Result<Matrix, LinalgError> {
        self.check_same_shape("sub", rhs)?;
        let data = self
            .data
            .iter()
            .zip(&rhs.data)
            .map(|(a, b)| a - b)
            .collect();
        Ok(Matrix {
            rows: self.rows,
            cols: self.cols,
            data,
        })
    }

    /// Matrix product `self * rhs`.
    pub fn mul(&self, rhs: &Matrix) -> Result<Matrix, LinalgError> {
        let mut out = Matrix::new(self.rows, rhs.cols);
        self.mul_into(rhs, &mut out)?;
        Ok(out)
    }

    /// Matrix product written into `out`, which is resized if needed.
    /// On a dimension mismatch `out` is left untouched.
    pub fn mul_into(&self, rhs: &Matrix, out: &mut Matrix) -> Result<(), LinalgError> {
        if self.cols != rhs.rows {
            return Err(LinalgError::DimensionMismatch {
                op: "mul",
                left: self.shape(),
                right: rhs.shape(),
            });
        }
        out.resize(self.rows, rhs.cols);
        for i in 0..self.rows {
            for j in 0..rhs.cols {
                let mut sum = 0.0;
                for k in 0..self.cols {
                    sum += self[(i, k)] * rhs[(k, j)];
                }
                out[(i, j)] = sum;
            }
        }
        Ok(())
    }

    /// Multiply every element by `a`.
    pub fn scale(&self, a: f64) -> Matrix {
        Matrix {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().map(|x| a * x).collect(),
        }
    }

    /// Squared Frobenius norm.
    pub fn norm_squared(&self) -> f64 {
        let mut sum = 0.0;
        for x in &self.data {
            sum += x * x;
        }
        sum
    }

    /// Largest absolute element-wise difference, or `None` if shapes differ.
    pub fn max_abs_diff(&self, other: &Matrix) -> Option<f64> {
        if self.shape() != other.shape() {
            return None;
        }
        Some(
            self.data
                .iter()
                .zip(&other.data)
                .map(|(a, b)| (a - b).abs())
                .fold(0.0, f64::max),
        )
    }

    /// Swap rows `a` and `b`.
    pub fn swap_rows(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        for j in 0..self.cols {
            self.data.swap(a * self.cols + j, b * self.cols + j);
        }
    }

    /// Swap columns `a` and `b`.
    pub fn swap_cols(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        for i in 0..self.rows {
            self.data.swap(i * self.cols + a, i * self.cols + b);
        }
    }

    fn check_same_shape(&self, op: &'static str, rhs: &Matrix) -> Result<(), LinalgError> {
        if self.shape() != rhs.shape() {
            return Err(LinalgError::DimensionMismatch {
                op,
                left: self.shape(),
                right: rhs.shape(),
            });
        }
        Ok(())
    }
}

impl Index<(usize, usize)> for Matrix {
    type Output = f64;

    fn index(&self, (row, col): (usize, usize)) -> &f64 {
        debug_assert!(row < self.rows && col < self.cols);
        &self.data[row * self.cols + col]
    }
}

impl IndexMut<(usize, usize)> for Matrix {
    fn index_mut(&mut self, (row, col): (usize, usize)) -> &mut f64 {
        debug_assert!(row < self.rows && col < self.cols);
        &mut self.data[row * self.cols + col]
    }
}

impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in 0..self.rows {
            for x in self.row(i) {
                write!(f, " {:13.10}", x)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

impl From<Matrix> for Vec<Vec<f64>> {
    fn from(m: Matrix) -> Self {
        (0..m.rows).map(|i| m.row(i).to_vec()).collect()
    }
}

impl TryFrom<Vec<Vec<f64>>> for Matrix {
    type Error = LinalgError;

    fn try_from(rows: Vec<Vec<f64>>) -> Result<Self, Self::Error> {
        Matrix::from_rows(&rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Matrix {
        Matrix::from_rows(&[
            vec![1.0, 2.0, 3.0],
            vec![4.0, 5.0, 6.0],
        ])
        .unwrap()
    }

    #[test]
    fn test_new_is_zero_filled() {
        let m = Matrix::new(3, 2);
        assert_eq!(m.shape(), (3, 2));
        assert!(m.as_slice().iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_from_rows_rejects_ragged_input() {
        let err = Matrix::from_rows(&[vec![1.0, 2.0], vec![3.0]]).unwrap_err();
        assert!(matches!(err, LinalgError::InvalidShape(_)));
    }

    #[test]
    fn test_double_transpose_is_identity() {
        let a = sample();
        assert_eq!(a.transpose().shape(), (3, 2));
        assert_eq!(a.transpose().transpose(), a);
    }

    #[test]
    fn test_transpose_in_place_changes_shape() {
        let mut a = sample();
        a.transpose_in_place();
        assert_eq!(a.shape(), (3, 2));
        assert_eq!(a[(2, 1)], 6.0);
        assert_eq!(a[(0, 1)], 4.0);
    }

    #[test]
    fn test_multiply_by_identity() {
        let a = sample();
        assert_eq!(a.mul(&Matrix::identity(3)).unwrap(), a);
        assert_eq!(Matrix::identity(2).mul(&a).unwrap(), a);
    }

    #[test]
    fn test_add_then_sub_recovers_input() {
        let a = sample();
        let b = Matrix::from_rows(&[vec![0.1, -7.25, 3.0e5], vec![1e-9, 2.5, -0.75]]).unwrap();
        let back = a.add(&b).unwrap().sub(&b).unwrap();
        assert!(back.max_abs_diff(&a).unwrap() < 1e-9);
    }

    #[test]
    fn test_product_values() {
        let a = sample();
        let p = a.mul(&a.transpose()).unwrap();
        assert_eq!(p, Matrix::from_rows(&[vec![14.0, 32.0], vec![32.0, 77.0]]).unwrap());
    }

    #[test]
    fn test_dimension_mismatch_is_reported() {
        let a = sample();
        let err = a.add(&Matrix::new(3, 2)).unwrap_err();
        assert_eq!(
            err,
            LinalgError::DimensionMismatch { op: "add", left: (2, 3), right: (3, 2) }
        );
        assert!(a.sub(&Matrix::new(2, 2)).is_err());
        assert!(a.mul(&a).is_err());
    }

    #[test]
    fn test_mul_into_leaves_output_untouched_on_mismatch() {
        let a = sample();
        let mut out = Matrix::identity(4);
        assert!(a.mul_into(&Matrix::new(2, 2), &mut out).is_err());
        assert_eq!(out, Matrix::identity(4));
    }

    #[test]
    fn test_product_written_back_into_operand() {
        let mut a = Matrix::from_rows(&[vec![1.0, 1.0], vec![0.0, 1.0]]).unwrap();
        a = a.mul(&a).unwrap();
        assert_eq!(a, Matrix::from_rows(&[vec![1.0, 2.0], vec![0.0, 1.0]]).unwrap());
    }

    #[test]
    fn test_resize_discards_unless_same_shape() {
        let mut a = sample();
        a.resize(2, 3);
        assert_eq!(a, sample());
        a.resize(3, 3);
        assert_eq!(a, Matrix::new(3, 3));
    }

    #[test]
    fn test_copy_from_adopts_shape() {
        let mut a = Matrix::new(1, 1);
        a.copy_from(&sample());
        assert_eq!(a, sample());
    }

    #[test]
    fn test_scale_and_norm() {
        let a = sample().scale(-2.0);
        assert_eq!(a[(1, 2)], -12.0);
        assert_eq!(sample().norm_squared(), 91.0);
    }

    #[test]
    fn test_rectangular_identity() {
        let mut a = Matrix::new(3, 2);
        a.set_identity();
        assert_eq!(a.column(0), vec![1.0, 0.0, 0.0]);
        assert_eq!(a.column(1), vec![0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_swaps() {
        let mut a = sample();
        a.swap_rows(0, 1);
        assert_eq!(a.row(0), &[4.0, 5.0, 6.0]);
        a.swap_cols(0, 2);
        assert_eq!(a.row(0), &[6.0, 5.0, 4.0]);
    }

    #[test]
    fn test_display_dump() {
        let text = Matrix::identity(2).to_string();
        assert_eq!(text.lines().count(), 2);
        assert!(text.starts_with("  1.0000000000"));
    }

    #[test]
    fn test_serde_uses_nested_rows() {
        let json = serde_json::to_string(&sample()).unwrap();
        assert_eq!(json, "[[1.0,2.0,3.0],[4.0,5.0,6.0]]");
        let back: Matrix = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sample());
        assert!(serde_json::from_str::<Matrix>("[[1.0],[2.0,3.0]]").is_err());
    }
}
