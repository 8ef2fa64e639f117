//! Ordinary least squares and small dense symmetric solves.
//!
//! Used for ARIMAX starting values and for the Gauss-Newton covariance of
//! the estimated coefficients.

use crate::error::{ForecastError, Result};

/// Fit `y = X β` by the normal equations, returning `β` in column order.
///
/// A tiny ridge term keeps the system solvable when a column is constant
/// or collinear with another.
pub fn least_squares(y: &[f64], columns: &[Vec<f64>]) -> Result<Vec<f64>> {
    let n = y.len();
    if n == 0 {
        return Err(ForecastError::InsufficientData { needed: 1, got: 0 });
    }
    for column in columns {
        if column.len() != n {
            return Err(ForecastError::shape("OLS design column", n, column.len()));
        }
    }
    if columns.is_empty() {
        return Ok(vec![]);
    }

    let k = columns.len();
    let mut xtx = vec![vec![0.0; k]; k];
    let mut xty = vec![0.0; k];
    for obs in 0..n {
        for i in 0..k {
            let xi = columns[i][obs];
            xty[i] += xi * y[obs];
            for j in 0..=i {
                xtx[i][j] += xi * columns[j][obs];
            }
        }
    }
    for i in 0..k {
        for j in 0..i {
            xtx[j][i] = xtx[i][j];
        }
        xtx[i][i] += 1e-8;
    }

    solve_symmetric(&xtx, &xty).ok_or_else(|| {
        ForecastError::ComputationError(
            "OLS regression failed: matrix not positive definite".into(),
        )
    })
}

/// Cholesky factor `L` with `A = L Lᵀ`, or `None` if `A` is not positive definite.
fn cholesky(a: &[Vec<f64>]) -> Option<Vec<Vec<f64>>> {
    let n = a.len();
    let mut l = vec![vec![0.0; n]; n];
    for i in 0..n {
        if a[i].len() != n {
            return None;
        }
        for j in 0..=i {
            let mut sum = a[i][j];
            for k in 0..j {
                sum -= l[i][k] * l[j][k];
            }
            if i == j {
                if sum <= 0.0 || !sum.is_finite() {
                    return None;
                }
                l[i][j] = sum.sqrt();
            } else {
                l[i][j] = sum / l[j][j];
            }
        }
    }
    Some(l)
}

fn cholesky_solve(l: &[Vec<f64>], b: &[f64]) -> Vec<f64> {
    let n = b.len();
    let mut y = vec![0.0; n];
    for i in 0..n {
        let mut sum = b[i];
        for j in 0..i {
            sum -= l[i][j] * y[j];
        }
        y[i] = sum / l[i][i];
    }
    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        let mut sum = y[i];
        for j in (i + 1)..n {
            sum -= l[j][i] * x[j];
        }
        x[i] = sum / l[i][i];
    }
    x
}

/// Solve `A x = b` for symmetric positive definite `A`.
pub fn solve_symmetric(a: &[Vec<f64>], b: &[f64]) -> Option<Vec<f64>> {
    if b.is_empty() || a.len() != b.len() {
        return None;
    }
    let l = cholesky(a)?;
    Some(cholesky_solve(&l, b))
}

/// Invert a symmetric positive definite matrix.
pub fn invert_symmetric(a: &[Vec<f64>]) -> Option<Vec<Vec<f64>>> {
    let n = a.len();
    if n == 0 {
        return None;
    }
    let l = cholesky(a)?;
    let mut inverse = vec![vec![0.0; n]; n];
    for col in 0..n {
        let mut unit = vec![0.0; n];
        unit[col] = 1.0;
        let x = cholesky_solve(&l, &unit);
        for row in 0..n {
            inverse[row][col] = x[row];
        }
    }
    Some(inverse)
}
