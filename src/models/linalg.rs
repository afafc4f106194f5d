//! Small dense linear algebra on `ndarray` for the IRLS normal equations.

use ndarray::Array2;

/// Relative pivot size below which a matrix is treated as singular.
const PIVOT_TOLERANCE: f64 = 1e-10;

/// Lower-triangular Cholesky factor of a symmetric positive-definite matrix.
///
/// Returns `Err(column)` with the first column whose pivot collapses.
pub fn cholesky(a: &Array2<f64>) -> Result<Array2<f64>, usize> {
    let n = a.nrows();
    debug_assert_eq!(n, a.ncols());

    let scale = a
        .diag()
        .iter()
        .fold(0.0_f64, |acc, v| acc.max(v.abs()))
        .max(f64::MIN_POSITIVE);
    let mut l = Array2::<f64>::zeros((n, n));

    for j in 0..n {
        let mut pivot = a[[j, j]];
        for k in 0..j {
            pivot -= l[[j, k]] * l[[j, k]];
        }
        if !pivot.is_finite() || pivot <= PIVOT_TOLERANCE * scale {
            return Err(j);
        }
        let pivot = pivot.sqrt();
        l[[j, j]] = pivot;

        for i in (j + 1)..n {
            let mut sum = a[[i, j]];
            for k in 0..j {
                sum -= l[[i, k]] * l[[j, k]];
            }
            l[[i, j]] = sum / pivot;
        }
    }

    Ok(l)
}

/// Inverse of a symmetric positive-definite matrix via its Cholesky factor.
pub fn spd_inverse(a: &Array2<f64>) -> Result<Array2<f64>, usize> {
    let l = cholesky(a)?;
    let n = l.nrows();

    // Invert L by forward substitution, then A^-1 = L^-T L^-1.
    let mut l_inv = Array2::<f64>::zeros((n, n));
    for col in 0..n {
        for i in col..n {
            let mut sum = if i == col { 1.0 } else { 0.0 };
            for k in col..i {
                sum -= l[[i, k]] * l_inv[[k, col]];
            }
            l_inv[[i, col]] = sum / l[[i, i]];
        }
    }

    Ok(l_inv.t().dot(&l_inv))
}
