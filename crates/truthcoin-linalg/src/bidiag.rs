// crates/truthcoin-linalg/src/bidiag.rs
//
// Householder reduction of a tall matrix to upper-bidiagonal form.
//
// Reflectors are materialized as full matrices and applied by ordinary
// products. That is slower than the rank-one update form but keeps the
// floating-point operation order fixed, which the resolution results
// depend on.

use crate::error::LinalgError;
use crate::matrix::Matrix;

/// Result of [`bidiagonalize`]: `A = U * B * V`.
///
/// `U` is `rows x rows` and orthogonal, `B` has the shape of the input and is
/// zero outside its main diagonal and first superdiagonal, and `V` is
/// `cols x cols` and orthogonal. `V` is the factor as it appears on the right
/// of the product, i.e. already transposed.
#[derive(Debug, Clone)]
pub struct Bidiagonal {
    pub u: Matrix,
    pub b: Matrix,
    pub v: Matrix,
}

/// Reduce `a` (with `rows >= cols`) to upper-bidiagonal form.
pub fn bidiagonalize(a: &Matrix) -> Result<Bidiagonal, LinalgError> {
    let (m, n) = a.shape();
    if m < n {
        return Err(LinalgError::InvalidShape(format!(
            "bidiagonalization needs rows >= cols, got {}x{}",
            m, n
        )));
    }

    let mut b = a.clone();
    let mut u = Matrix::identity(m);
    let mut v = Matrix::identity(n);

    let mut k = 0;
    while k < n && k + 1 < m {
        // Left reflector: zero column k below the diagonal.
        let mut norm_sq = 0.0;
        for i in k..m {
            norm_sq += b[(i, k)] * b[(i, k)];
        }
        if norm_sq != 0.0 {
            let pivot = b[(k, k)];
            let beta = reflector_sign(pivot) * norm_sq.sqrt();
            let s = pivot - beta;
            let tau = -s / beta;
            let house: Vec<f64> = (0..m)
                .map(|i| {
                    if i > k {
                        b[(i, k)] / s
                    } else if i == k {
                        1.0
                    } else {
                        0.0
                    }
                })
                .collect();
            let p = reflector(&house, tau)?;
            b = p.mul(&b)?;
            u = u.mul(&p)?;
        }

        // Right reflector: zero row k beyond the superdiagonal.
        if k + 2 < n {
            let mut norm_sq = 0.0;
            for i in (k + 1)..n {
                norm_sq += b[(k, i)] * b[(k, i)];
            }
            let pivot = b[(k, k + 1)];
            let beta = reflector_sign(pivot) * norm_sq.sqrt();
            if norm_sq != 0.0 {
                let s = pivot - beta;
                let tau = -s / beta;
                let house: Vec<f64> = (0..n)
                    .map(|i| {
                        if i > k + 1 {
                            b[(k, i)] / s
                        } else if i == k + 1 {
                            1.0
                        } else {
                            0.0
                        }
                    })
                    .collect();
                let p = reflector(&house, tau)?;
                b = b.mul(&p)?;
                v = p.mul(&v)?;
            }
        }

        k += 1;
    }

    Ok(Bidiagonal { u, b, v })
}

fn reflector_sign(pivot: f64) -> f64 {
    if pivot > 0.0 {
        -1.0
    } else {
        1.0
    }
}

/// `I - tau * u * u^T`.
fn reflector(house: &[f64], tau: f64) -> Result<Matrix, LinalgError> {
    let u = Matrix::column_vector(house);
    let outer = u.mul(&u.transpose())?;
    Matrix::identity(house.len()).add(&outer.scale(-tau))
}
