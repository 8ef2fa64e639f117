//! Vector kernels.
//!
//! `mean` and `variance` run through Trueno in `f32` and are only used for
//! reporting (residual summaries). The distance kernels stay in scalar `f64`
//! because they feed metrics that are compared against each other.
//!
//! ```
//! use wavecast::simd;
//!
//! let residuals = vec![0.2, -0.1, 0.05, -0.15];
//! assert!(simd::mean(&residuals).abs() < 1e-6);
//! assert!(simd::variance(&residuals) > 0.0);
//! ```

use trueno::Vector;

fn narrow(data: &[f64]) -> Vec<f32> {
    data.iter().map(|&x| x as f32).collect()
}

/// Arithmetic mean, NaN when empty.
pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return f64::NAN;
    }
    match Vector::from_slice(&narrow(data)).mean() {
        Ok(m) => m as f64,
        Err(_) => data.iter().sum::<f64>() / data.len() as f64,
    }
}

/// Population variance, NaN for fewer than two values.
pub fn variance(data: &[f64]) -> f64 {
    if data.len() < 2 {
        return f64::NAN;
    }
    match Vector::from_slice(&narrow(data)).variance() {
        Ok(v) => v as f64,
        Err(_) => {
            let m = data.iter().sum::<f64>() / data.len() as f64;
            data.iter().map(|x| (x - m) * (x - m)).sum::<f64>() / data.len() as f64
        }
    }
}

/// Σ(a - b)².
///
/// # Panics
///
/// Panics on a length mismatch.
pub fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    assert_eq!(a.len(), b.len(), "squared_distance: length mismatch");
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Σ|a - b|.
///
/// # Panics
///
/// Panics on a length mismatch.
pub fn l1_distance(a: &[f64], b: &[f64]) -> f64 {
    assert_eq!(a.len(), b.len(), "l1_distance: length mismatch");
    a.iter().zip(b).map(|(x, y)| (x - y).abs()).sum()
}
