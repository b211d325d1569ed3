// crates/truthcoin-linalg/src/svd.rs
//
// Thin singular value decomposition by Householder bidiagonalization
// followed by implicit-shift Golub-Kahan sweeps.
//
// The sweep order, deflation rules and shift choice are fixed: the vote
// resolution engine reads the first left singular vector, and its sign and
// rounding must be identical on every node that runs a resolution.

use tracing::{trace, warn};

use crate::bidiag::bidiagonalize;
use crate::error::LinalgError;
use crate::matrix::Matrix;

/// Relative size below which a bidiagonal entry counts as converged.
const RELATIVE_EPSILON: f64 = 1e-12;

/// How a negligible diagonal entry is split off the active block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ZeroDiagonal {
    /// The rule every resolving node runs. The row is rotated against the
    /// rows below, then the index after it moves to the front of the block.
    /// A trailing zero whose left neighbour is still live is left to the
    /// sweeps. Singular values come out right, but on rank-deficient input
    /// `U * D * V^T` need not reproduce `A`. Do not change it: resolved
    /// outcomes depend on its exact output.
    #[default]
    Consensus,
    /// Rotate the zero's row free to the right and its column free upward,
    /// then move that same index to the front. Always reproduces `A`.
    Chase,
}

/// Knobs for [`svd_with`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SvdOptions {
    /// Return [`LinalgError::NonConvergence`] instead of a best-effort
    /// result when the iteration budget runs out.
    pub strict: bool,
    /// Iteration budget per column of the input.
    pub sweeps_per_column: usize,
    /// Zero-diagonal deflation rule.
    pub zero_diagonal: ZeroDiagonal,
}

impl Default for SvdOptions {
    fn default() -> Self {
        Self {
            strict: false,
            sweeps_per_column: 100,
            zero_diagonal: ZeroDiagonal::Consensus,
        }
    }
}

/// `A = U * D * V^T` for a `rows x cols` input with `rows >= cols`.
#[derive(Debug, Clone)]
pub struct Svd {
    /// `rows x cols`, orthonormal columns.
    pub u: Matrix,
    /// `cols x cols`, diagonal, non-negative, non-increasing.
    pub d: Matrix,
    /// `cols x cols`, orthogonal.
    pub v: Matrix,
    /// False if the iteration budget ran out first.
    pub converged: bool,
    /// Iterations actually spent.
    pub iterations: usize,
}

impl Svd {
    /// Diagonal of `D`, largest first.
    pub fn singular_values(&self) -> Vec<f64> {
        (0..self.d.rows()).map(|i| self.d[(i, i)]).collect()
    }

    /// Recompute `U * D * V^T`.
    pub fn reconstruct(&self) -> Result<Matrix, LinalgError> {
        self.u.mul(&self.d)?.mul(&self.v.transpose())
    }
}

/// Decompose `a` with default options.
pub fn svd(a: &Matrix) -> Result<Svd, LinalgError> {
    svd_with(a, SvdOptions::default())
}

/// Decompose `a`.
pub fn svd_with(a: &Matrix, options: SvdOptions) -> Result<Svd, LinalgError> {
    let (m, n) = a.shape();
    if m < n || n == 0 {
        return Err(LinalgError::InvalidShape(format!(
            "svd needs rows >= cols >= 1, got {}x{}",
            m, n
        )));
    }

    if n == 1 {
        return Ok(single_column(a));
    }

    let bidiag = bidiagonalize(a)?;

    let mut u = Matrix::new(m, n);
    for i in 0..m {
        u.row_mut(i).copy_from_slice(&bidiag.u.row(i)[..n]);
    }
    let mut d = Matrix::new(n, n);
    for i in 0..n {
        d.row_mut(i).copy_from_slice(bidiag.b.row(i));
    }

    let mut state = GolubKahan::new(u, d, bidiag.v, options.zero_diagonal);
    let max_iterations = options.sweeps_per_column * n;
    let (converged, iterations) = state.iterate(max_iterations);

    if !converged {
        if options.strict {
            return Err(LinalgError::NonConvergence { iterations });
        }
        warn!(
            rows = m,
            cols = n,
            iterations,
            "SVD hit its iteration budget; returning best-effort factors"
        );
    } else {
        trace!(rows = m, cols = n, iterations, "SVD converged");
    }

    let (u, d, v) = state.finish();
    Ok(Svd {
        u,
        d,
        v,
        converged,
        iterations,
    })
}

fn single_column(a: &Matrix) -> Svd {
    let norm = a.norm_squared().sqrt();
    let mut u = a.clone();
    if norm != 0.0 {
        // Multiply by the reciprocal; dividing rounds differently.
        let inv = 1.0 / norm;
        for i in 0..u.rows() {
            u[(i, 0)] = a[(i, 0)] * inv;
        }
    }
    let mut d = Matrix::new(1, 1);
    d[(0, 0)] = norm;
    Svd {
        u,
        d,
        v: Matrix::identity(1),
        converged: true,
        iterations: 0,
    }
}

/// Working state of the iteration. `d` is square bidiagonal, `u` is
/// `rows x n`, and `v` is kept in row form (`A = U * D * V`) until
/// [`GolubKahan::finish`] transposes it.
struct GolubKahan {
    u: Matrix,
    d: Matrix,
    v: Matrix,
    n: usize,
    threshold: f64,
    zero_threshold: f64,
    zero_diagonal: ZeroDiagonal,
}

impl GolubKahan {
    fn new(u: Matrix, d: Matrix, v: Matrix, zero_diagonal: ZeroDiagonal) -> Self {
        let n = d.rows();
        let mut threshold = d[(0, 0)];
        for i in 0..n {
            if d[(i, i)].abs() > threshold {
                threshold = d[(i, i)].abs();
            }
        }
        for i in 0..n - 1 {
            if d[(i, i + 1)].abs() > threshold {
                threshold = d[(i, i + 1)].abs();
            }
        }
        threshold *= RELATIVE_EPSILON;
        Self {
            u,
            d,
            v,
            n,
            threshold,
            zero_threshold: 0.1 * threshold,
            zero_diagonal,
        }
    }

    /// Run until the superdiagonal vanishes or the budget is spent.
    /// Returns `(converged, iterations)`.
    fn iterate(&mut self, max_iterations: usize) -> (bool, usize) {
        let mut i0 = 0;
        for iteration in 0..max_iterations {
            i0 = self.deflate_zero_diagonal(i0);
            i0 = self.deflate_small_superdiagonal(i0);

            if i0 + 1 >= self.n || self.largest_superdiagonal(i0) < self.threshold {
                return (true, iteration);
            }

            let i1 = self.block_end(i0);
            let mu = self.wilkinson_shift(i1);
            self.sweep(i0, i1, mu);
        }
        let converged = i0 + 1 >= self.n || self.largest_superdiagonal(i0) < self.threshold;
        (converged, max_iterations)
    }

    fn largest_superdiagonal(&self, i0: usize) -> f64 {
        let mut largest = 0.0;
        for i in i0..self.n - 1 {
            if self.d[(i, i + 1)].abs() > largest {
                largest = self.d[(i, i + 1)].abs();
            }
        }
        largest
    }

    /// Split off negligible diagonal entries at or after `i0`, moving each
    /// split index to the front of the active block.
    fn deflate_zero_diagonal(&mut self, i0: usize) -> usize {
        match self.zero_diagonal {
            ZeroDiagonal::Consensus => self.deflate_zero_diagonal_consensus(i0),
            ZeroDiagonal::Chase => self.deflate_zero_diagonal_chase(i0),
        }
    }

    fn deflate_zero_diagonal_consensus(&mut self, mut i0: usize) -> usize {
        let n = self.n;
        let zt = self.zero_threshold;
        let mut i1 = i0;
        while i1 < n {
            if self.d[(i1, i1)].abs() > zt {
                i1 += 1;
                continue;
            }
            // n >= 2 here, so a trailing index always has a left neighbour.
            if i1 + 1 == n && self.d[(i1 - 1, i1)].abs() > zt {
                i1 += 1;
                continue;
            }
            let mut k = i1;
            if i1 + 1 < n && self.d[(i1, i1 + 1)].abs() > zt {
                for i in i1..n - 1 {
                    let alpha = self.d[(i1, i + 1)];
                    if alpha.abs() < zt {
                        break;
                    }
                    let beta = self.d[(i + 1, i + 1)];
                    let gamma = (alpha * alpha + beta * beta).sqrt();
                    let c = beta / gamma;
                    let s = alpha / gamma;
                    self.rotate_d_rows(i1, i + 1, c, s);
                    self.rotate_u_cols(i1, i + 1, c, s);
                }
                k += 1;
            }
            let front = if k + 1 < n { self.d[(k, k + 1)] } else { 0.0 };
            self.move_to_front(i0, k, front);
            i0 += 1;
            i1 = k + 1;
        }
        i0
    }

    fn deflate_zero_diagonal_chase(&mut self, mut i0: usize) -> usize {
        let n = self.n;
        let zt = self.zero_threshold;
        let mut i1 = i0;
        while i1 < n {
            if self.d[(i1, i1)].abs() > zt {
                i1 += 1;
                continue;
            }
            self.d[(i1, i1)] = 0.0;
            if i1 + 1 < n && self.d[(i1, i1 + 1)].abs() > zt {
                self.chase_row_right(i1);
            }
            if i1 > i0 && self.d[(i1 - 1, i1)].abs() > zt {
                self.chase_column_up(i0, i1);
            }
            if i1 + 1 < n {
                self.d[(i1, i1 + 1)] = 0.0;
            }
            if i1 > i0 {
                self.d[(i1 - 1, i1)] = 0.0;
            }
            self.move_to_front(i0, i1, 0.0);
            i0 += 1;
            i1 += 1;
        }
        i0
    }

    /// Row `k` has a zero diagonal; push its superdiagonal entry off the
    /// right edge with left rotations against the rows below.
    fn chase_row_right(&mut self, k: usize) {
        let zt = self.zero_threshold;
        for i in k..self.n - 1 {
            let alpha = self.d[(k, i + 1)];
            if alpha.abs() <= zt {
                break;
            }
            let beta = self.d[(i + 1, i + 1)];
            let gamma = (alpha * alpha + beta * beta).sqrt();
            if gamma == 0.0 {
                break;
            }
            let c = beta / gamma;
            let s = alpha / gamma;
            self.rotate_d_rows(k, i + 1, c, s);
            self.rotate_u_cols(k, i + 1, c, s);
            self.d[(k, i + 1)] = 0.0;
        }
    }

    /// Column `k` has a zero diagonal; push its superdiagonal entry up to
    /// row `i0` with right rotations against the columns to its left.
    fn chase_column_up(&mut self, i0: usize, k: usize) {
        let zt = self.zero_threshold;
        for j in (i0..k).rev() {
            let f = self.d[(j, k)];
            if f.abs() <= zt {
                break;
            }
            let dj = self.d[(j, j)];
            let gamma = (dj * dj + f * f).sqrt();
            if gamma == 0.0 {
                break;
            }
            let c = dj / gamma;
            let s = -f / gamma;
            self.rotate_d_cols(j, k, c, s);
            self.rotate_v_rows(j, k, c, s);
            self.d[(j, k)] = 0.0;
        }
    }

    /// Move every leading negligible superdiagonal to the front of the
    /// active block.
    fn deflate_small_superdiagonal(&mut self, mut i0: usize) -> usize {
        let n = self.n;
        let zt = self.zero_threshold;
        let mut i = i0;
        while i + 1 < n {
            if self.d[(i, i + 1)].abs() >= zt {
                i += 1;
            } else if i == i0 {
                i0 += 1;
                i += 1;
            } else if i + 2 != n {
                i += 1;
            } else {
                let front = self.d[(i, i + 1)];
                self.move_to_front(i0, i + 1, front);
                i0 += 1;
                if i0 == i {
                    i += 1;
                }
            }
        }
        i0
    }

    /// Cyclically shift index `k` down to `i0`: V rows, U columns, the
    /// diagonal and the superdiagonal all move together. The superdiagonal
    /// entry that lands at `i0` is `front`.
    fn move_to_front(&mut self, i0: usize, k: usize, front: f64) {
        let n = self.n;

        for j in 0..n {
            let tmp = self.v[(k, j)];
            for p in (i0 + 1..=k).rev() {
                self.v[(p, j)] = self.v[(p - 1, j)];
            }
            self.v[(i0, j)] = tmp;
        }

        for j in 0..self.u.rows() {
            let tmp = self.u[(j, k)];
            for p in (i0 + 1..=k).rev() {
                self.u[(j, p)] = self.u[(j, p - 1)];
            }
            self.u[(j, i0)] = tmp;
        }

        let tmp = self.d[(k, k)];
        for p in (i0 + 1..=k).rev() {
            self.d[(p, p)] = self.d[(p - 1, p - 1)];
        }
        self.d[(i0, i0)] = tmp;

        let last_super = k.min(n - 2);
        for p in (i0 + 1..=last_super).rev() {
            self.d[(p, p + 1)] = self.d[(p - 1, p)];
        }
        if i0 + 1 < n {
            self.d[(i0, i0 + 1)] = front;
        }
    }

    /// Last index of the unreduced block starting at `i0`.
    fn block_end(&self, i0: usize) -> usize {
        let mut i1 = i0;
        while i1 + 1 < self.n && self.d[(i1, i1 + 1)].abs() >= self.zero_threshold {
            i1 += 1;
        }
        i1
    }

    /// Eigenvalue of the trailing 2x2 of `T^T T` closest to its last entry.
    fn wilkinson_shift(&self, i1: usize) -> f64 {
        let mut t = [[0.0f64; 2]; 3];
        for (i, row) in t.iter_mut().enumerate() {
            for (j, cell) in row.iter_mut().enumerate() {
                if i1 + i > 2 {
                    *cell = self.d[(i1 + i - 2, i1 + j - 1)];
                }
            }
        }

        let mut tt = [[0.0f64; 2]; 2];
        for (i, out_row) in tt.iter_mut().enumerate() {
            for (j, cell) in out_row.iter_mut().enumerate() {
                let mut sum = 0.0;
                for row in &t {
                    sum += row[i] * row[j];
                }
                *cell = sum;
            }
        }

        let (l0, l1) = eigenvalues_2x2(tt);
        let last = tt[1][1];
        if (l0 - last).abs() < (l1 - last).abs() {
            l0
        } else {
            l1
        }
    }

    /// One implicit-shift QR sweep over `i0..=i1`.
    fn sweep(&mut self, i0: usize, i1: usize, mu: f64) {
        let n = self.n;
        let mut alpha = self.d[(i0, i0)] * self.d[(i0, i0)] - mu;
        let mut beta = self.d[(i0, i0)] * self.d[(i0, i0 + 1)];

        for i in i0..i1 {
            let gamma = (alpha * alpha + beta * beta).sqrt();
            if gamma > 0.0 {
                let c = alpha / gamma;
                let s = -beta / gamma;
                self.rotate_d_cols(i, i + 1, c, s);
                self.rotate_v_rows(i, i + 1, c, s);
            }

            alpha = self.d[(i, i)];
            beta = self.d[(i + 1, i)];
            let gamma = (alpha * alpha + beta * beta).sqrt();
            if gamma > 0.0 {
                let c = alpha / gamma;
                let s = -beta / gamma;
                self.rotate_d_rows(i, i + 1, c, s);
                self.rotate_u_cols(i, i + 1, c, s);
            }

            if i + 2 < n {
                alpha = self.d[(i, i + 1)];
                beta = self.d[(i, i + 2)];
            }
        }
    }

    fn rotate_d_rows(&mut self, p: usize, q: usize, c: f64, s: f64) {
        for j in 0..self.n {
            let a = self.d[(p, j)];
            let b = self.d[(q, j)];
            self.d[(p, j)] = a * c - b * s;
            self.d[(q, j)] = a * s + b * c;
        }
    }

    fn rotate_d_cols(&mut self, p: usize, q: usize, c: f64, s: f64) {
        for j in 0..self.n {
            let a = self.d[(j, p)];
            let b = self.d[(j, q)];
            self.d[(j, p)] = a * c - b * s;
            self.d[(j, q)] = a * s + b * c;
        }
    }

    fn rotate_u_cols(&mut self, p: usize, q: usize, c: f64, s: f64) {
        for j in 0..self.u.rows() {
            let a = self.u[(j, p)];
            let b = self.u[(j, q)];
            self.u[(j, p)] = a * c - b * s;
            self.u[(j, q)] = a * s + b * c;
        }
    }

    fn rotate_v_rows(&mut self, p: usize, q: usize, c: f64, s: f64) {
        for j in 0..self.n {
            let a = self.v[(p, j)];
            let b = self.v[(q, j)];
            self.v[(p, j)] = a * c - b * s;
            self.v[(q, j)] = a * s + b * c;
        }
    }

    /// Sort by magnitude, make the diagonal non-negative, clear the
    /// off-diagonal residue and return `(U, D, V)` with `V` in column form.
    fn finish(mut self) -> (Matrix, Matrix, Matrix) {
        let n = self.n;
        for i in 0..n {
            let mut largest = i;
            for j in (i + 1)..n {
                if self.d[(j, j)].abs() > self.d[(largest, largest)].abs() {
                    largest = j;
                }
            }
            if largest != i {
                self.v.swap_rows(i, largest);
                self.u.swap_cols(i, largest);
                let tmp = self.d[(i, i)];
                self.d[(i, i)] = self.d[(largest, largest)];
                self.d[(largest, largest)] = tmp;
            }

            if self.d[(i, i)] < 0.0 {
                self.d[(i, i)] = -self.d[(i, i)];
                for x in self.v.row_mut(i) {
                    *x = -*x;
                }
            }
        }

        for i in 0..n {
            for j in 0..n {
                if i != j {
                    self.d[(i, j)] = 0.0;
                }
            }
        }

        self.v.transpose_in_place();
        (self.u, self.d, self.v)
    }
}

/// Eigenvalues of a 2x2 matrix, larger first. A negative discriminant is
/// clamped to zero.
fn eigenvalues_2x2(m: [[f64; 2]; 2]) -> (f64, f64) {
    let a = m[0][0];
    let b = m[1][0];
    let c = m[0][1];
    let d = m[1][1];
    let half_trace = (a + d) / 2.0;
    let det = half_trace * half_trace - (a * d - b * c);
    let s = if det <= 0.0 { 0.0 } else { det.sqrt() };
    (half_trace + s, half_trace - s)
}
