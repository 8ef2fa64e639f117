//! Min-max scaling fitted once on training residuals.

use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};

/// Fitted min-max transform mapping the training range onto [0, 1].
///
/// The parameters are frozen at fit time and reused for validation, test
/// and inference data. Values outside the training range extrapolate
/// linearly, so [`MinMaxScaler::inverse_transform`] undoes
/// [`MinMaxScaler::transform`] for any finite input.
///
/// # Example
/// ```
/// use wavecast::transform::MinMaxScaler;
///
/// let scaler = MinMaxScaler::fit(&[-2.0, 0.0, 2.0]).unwrap();
/// assert_eq!(scaler.transform(&[0.0]), vec![0.5]);
/// assert_eq!(scaler.transform(&[4.0]), vec![1.5]);
/// assert_eq!(scaler.inverse_transform(&[1.5]), vec![4.0]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MinMaxScaler {
    min: f64,
    max: f64,
    /// `max - min`, or 1 when the fitted data is constant.
    scale: f64,
}

impl MinMaxScaler {
    /// Fit on `data`, which must be non-empty and finite.
    pub fn fit(data: &[f64]) -> Result<Self> {
        if data.is_empty() {
            return Err(ForecastError::EmptyData(
                "cannot fit min-max scaler on an empty series".to_string(),
            ));
        }
        if data.iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::InvalidParameter(
                "min-max scaler input must be finite".to_string(),
            ));
        }

        let min = data.iter().copied().fold(f64::INFINITY, f64::min);
        let max = data.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let range = max - min;
        let scale = if range < 1e-10 { 1.0 } else { range };

        Ok(Self { min, max, scale })
    }

    /// Fit on `data` and return the scaled copy alongside the scaler.
    pub fn fit_transform(data: &[f64]) -> Result<(Self, Vec<f64>)> {
        let scaler = Self::fit(data)?;
        let scaled = scaler.transform(data);
        Ok((scaler, scaled))
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    /// Whether the fitted data had no spread.
    pub fn is_degenerate(&self) -> bool {
        self.max - self.min < 1e-10
    }

    pub fn transform_value(&self, x: f64) -> f64 {
        (x - self.min) / self.scale
    }

    pub fn inverse_value(&self, x: f64) -> f64 {
        x * self.scale + self.min
    }

    pub fn transform(&self, data: &[f64]) -> Vec<f64> {
        data.iter().map(|&x| self.transform_value(x)).collect()
    }

    pub fn inverse_transform(&self, data: &[f64]) -> Vec<f64> {
        data.iter().map(|&x| self.inverse_value(x)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn training_range_maps_to_unit_interval() {
        let data = vec![3.0, -1.0, 1.0, 7.0];
        let (scaler, scaled) = MinMaxScaler::fit_transform(&data).unwrap();

        assert_relative_eq!(scaled[1], 0.0);
        assert_relative_eq!(scaled[3], 1.0);
        assert_relative_eq!(scaled[0], 0.5);
        assert_relative_eq!(scaler.min(), -1.0);
        assert_relative_eq!(scaler.max(), 7.0);
    }

    #[test]
    fn extrapolates_outside_training_range() {
        let scaler = MinMaxScaler::fit(&[0.0, 10.0]).unwrap();

        assert_relative_eq!(scaler.transform_value(-5.0), -0.5);
        assert_relative_eq!(scaler.inverse_value(2.0), 20.0);
    }

    #[test]
    fn constant_series_scales_to_zero() {
        let scaler = MinMaxScaler::fit(&[0.0; 50]).unwrap();

        assert!(scaler.is_degenerate());
        assert_eq!(scaler.transform(&[0.0, 0.0]), vec![0.0, 0.0]);
        assert_relative_eq!(scaler.inverse_value(0.0), 0.0);
    }

    #[test]
    fn fit_rejects_empty_and_non_finite() {
        assert!(matches!(
            MinMaxScaler::fit(&[]),
            Err(ForecastError::EmptyData(_))
        ));
        assert!(matches!(
            MinMaxScaler::fit(&[1.0, f64::INFINITY]),
            Err(ForecastError::InvalidParameter(_))
        ));
    }

    #[test]
    fn survives_serde_round_trip() {
        let scaler = MinMaxScaler::fit(&[-0.3, 0.9, 0.1]).unwrap();
        let json = serde_json::to_string(&scaler).unwrap();
        let restored: MinMaxScaler = serde_json::from_str(&json).unwrap();
        assert_eq!(scaler, restored);
    }
}
