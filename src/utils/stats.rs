//! Statistical utility functions.

use statrs::distribution::{ContinuousCDF, Normal};

/// Two-sided p-value of a standard-normal test statistic.
///
/// Returns NaN when `z` is not finite.
///
/// # Example
/// ```
/// use wavecast::utils::stats::normal_two_sided_p_value;
///
/// let p = normal_two_sided_p_value(1.96);
/// assert!((p - 0.05).abs() < 1e-3);
/// ```
pub fn normal_two_sided_p_value(z: f64) -> f64 {
    if !z.is_finite() {
        return f64::NAN;
    }
    Normal::new(0.0, 1.0)
        .map(|normal| 2.0 * (1.0 - normal.cdf(z.abs())))
        .unwrap_or(f64::NAN)
}

/// Calculate the mean of a slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample skewness (population moments), NaN for constant or short input.
pub fn skewness(values: &[f64]) -> f64 {
    let (m2, m3, _) = central_moments(values);
    if m2 <= 0.0 {
        return f64::NAN;
    }
    m3 / m2.powf(1.5)
}

/// Sample kurtosis (not excess; a normal distribution gives 3).
pub fn kurtosis(values: &[f64]) -> f64 {
    let (m2, _, m4) = central_moments(values);
    if m2 <= 0.0 {
        return f64::NAN;
    }
    m4 / (m2 * m2)
}

fn central_moments(values: &[f64]) -> (f64, f64, f64) {
    if values.len() < 3 {
        return (f64::NAN, f64::NAN, f64::NAN);
    }
    let n = values.len() as f64;
    let m = mean(values);
    let (m2, m3, m4) = values.iter().fold((0.0, 0.0, 0.0), |(a, b, c), &x| {
        let d = x - m;
        (a + d * d, b + d * d * d, c + d * d * d * d)
    });
    (m2 / n, m3 / n, m4 / n)
}
