//! Accuracy metrics for forecast evaluation.

use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};

/// Accuracy metrics for evaluating forecast performance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccuracyMetrics {
    /// Mean Absolute Percentage Error, in percent.
    pub mape: f64,
    /// Mean Absolute Error
    pub mae: f64,
    /// Root Mean Squared Error
    pub rmse: f64,
}

fn check_lengths(actual: &[f64], predicted: &[f64]) -> Result<()> {
    if actual.is_empty() || predicted.is_empty() {
        return Err(ForecastError::EmptyData(
            "metric inputs must not be empty".to_string(),
        ));
    }
    if actual.len() != predicted.len() {
        return Err(ForecastError::shape(
            "metric inputs",
            actual.len(),
            predicted.len(),
        ));
    }
    Ok(())
}

/// Mean Absolute Percentage Error in percent.
///
/// Observations whose actual value is zero are undefined and skipped; when
/// every actual is zero the result is `+∞`.
///
/// # Example
/// ```
/// use wavecast::utils::metrics::mape;
///
/// let value = mape(&[1.0, 2.0, 4.0], &[1.1, 1.8, 4.0]).unwrap();
/// assert!((value - 20.0 / 3.0).abs() < 1e-9);
/// ```
pub fn mape(actual: &[f64], predicted: &[f64]) -> Result<f64> {
    check_lengths(actual, predicted)?;

    let (sum, count) = actual
        .iter()
        .zip(predicted.iter())
        .filter(|(a, _)| **a != 0.0)
        .fold((0.0, 0usize), |(sum, count), (a, p)| {
            (sum + ((a - p) / a).abs(), count + 1)
        });

    if count == 0 {
        return Ok(f64::INFINITY);
    }
    Ok(100.0 * sum / count as f64)
}

/// Mean Absolute Error.
pub fn mae(actual: &[f64], predicted: &[f64]) -> Result<f64> {
    check_lengths(actual, predicted)?;
    Ok(crate::simd::l1_distance(actual, predicted) / actual.len() as f64)
}

/// Root Mean Squared Error.
pub fn rmse(actual: &[f64], predicted: &[f64]) -> Result<f64> {
    check_lengths(actual, predicted)?;
    Ok((crate::simd::squared_distance(actual, predicted) / actual.len() as f64).sqrt())
}

/// Calculate MAPE, MAE and RMSE between actual and predicted values.
pub fn calculate_metrics(actual: &[f64], predicted: &[f64]) -> Result<AccuracyMetrics> {
    Ok(AccuracyMetrics {
        mape: mape(actual, predicted)?,
        mae: mae(actual, predicted)?,
        rmse: rmse(actual, predicted)?,
    })
}
