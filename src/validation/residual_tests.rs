//! Residual diagnostics for the linear model.
//!
//! Both checks are informational: they describe the ARIMAX residuals that
//! the residual forecaster will learn from and never change acceptance.

use crate::utils::stats::{kurtosis, skewness};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ChiSquared, ContinuousCDF};

/// Ljung-Box test result.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LjungBoxResult {
    /// Test statistic Q
    pub statistic: f64,
    pub p_value: f64,
    pub lags: usize,
    /// Degrees of freedom
    pub df: usize,
}

impl LjungBoxResult {
    /// Fail to reject independence at level `alpha`.
    pub fn is_white_noise(&self, alpha: f64) -> bool {
        self.p_value > alpha
    }
}

/// Ljung-Box test for autocorrelation in residuals.
///
/// `lags` defaults to `min(10, n / 5)`; `fitted_params` reduces the degrees
/// of freedom. Fewer than three residuals yield NaN statistics.
pub fn ljung_box(residuals: &[f64], lags: Option<usize>, fitted_params: usize) -> LjungBoxResult {
    let n = residuals.len();
    if n < 3 {
        return LjungBoxResult {
            statistic: f64::NAN,
            p_value: f64::NAN,
            lags: 0,
            df: 0,
        };
    }

    let lags = lags.unwrap_or_else(|| 10.min(n / 5)).clamp(1, n - 1);
    let df = lags.saturating_sub(fitted_params).max(1);

    let mean = residuals.iter().sum::<f64>() / n as f64;
    let centered: Vec<f64> = residuals.iter().map(|&x| x - mean).collect();
    let var: f64 = centered.iter().map(|&x| x * x).sum();
    if var == 0.0 {
        return LjungBoxResult {
            statistic: 0.0,
            p_value: 1.0,
            lags,
            df,
        };
    }

    let q = (1..=lags)
        .map(|k| {
            let acf: f64 = centered
                .iter()
                .skip(k)
                .zip(&centered)
                .map(|(a, b)| a * b)
                .sum::<f64>()
                / var;
            acf * acf / (n - k) as f64
        })
        .sum::<f64>()
        * (n * (n + 2)) as f64;

    let p_value = ChiSquared::new(df as f64)
        .map(|chi| chi.sf(q))
        .unwrap_or(f64::NAN);

    LjungBoxResult {
        statistic: q,
        p_value,
        lags,
        df,
    }
}

/// Moment-based normality check.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalityCheck {
    pub skewness: f64,
    /// Not excess; 3 for a normal distribution.
    pub kurtosis: f64,
    /// `|skewness| < 1` and `|kurtosis - 3| < 2`.
    pub is_normal: bool,
}

pub fn normality_check(residuals: &[f64]) -> NormalityCheck {
    let skewness = skewness(residuals);
    let kurtosis = kurtosis(residuals);
    NormalityCheck {
        skewness,
        kurtosis,
        is_normal: skewness.abs() < 1.0 && (kurtosis - 3.0).abs() < 2.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alternating_residuals_are_autocorrelated() {
        let residuals: Vec<f64> = (0..60).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        let result = ljung_box(&residuals, Some(5), 0);

        assert!(result.statistic > 50.0);
        assert!(!result.is_white_noise(0.05));
    }

    #[test]
    fn constant_residuals_pass() {
        let result = ljung_box(&[0.5; 20], None, 0);
        assert_eq!(result.statistic, 0.0);
        assert_eq!(result.p_value, 1.0);
    }

    #[test]
    fn short_input_is_nan() {
        assert!(ljung_box(&[1.0, 2.0], None, 0).statistic.is_nan());
    }

    #[test]
    fn degrees_of_freedom_account_for_parameters() {
        let residuals: Vec<f64> = (0..50).map(|i| (i as f64 * 1.3).sin()).collect();
        let result = ljung_box(&residuals, Some(10), 3);
        assert_eq!(result.df, 7);
    }

    #[test]
    fn heavy_outlier_breaks_normality() {
        let mut residuals = vec![0.0, 0.1, -0.1, 0.05, -0.05, 0.02, -0.02, 0.08, -0.08, 0.0];
        residuals.push(10.0);
        let check = normality_check(&residuals);

        assert!(check.skewness > 1.0);
        assert!(!check.is_normal);
    }

    #[test]
    fn symmetric_residuals_look_normal() {
        // Uniform grid on (-1, 1): kurtosis 1.8.
        let residuals: Vec<f64> = (0..200)
            .map(|i| ((i as f64 + 0.5) / 200.0 - 0.5) * 2.0)
            .collect();
        let check = normality_check(&residuals);
        assert!(check.skewness.abs() < 1e-9);
        assert!(check.is_normal);
    }
}
