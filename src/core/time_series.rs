//! Wave-height observations with the wind-speed regressor.

use crate::error::{ForecastError, Result};
use chrono::{DateTime, Utc};
use std::ops::Range;

/// Ordered (timestamp, wave height, wind speed) samples.
///
/// Construction enforces strictly increasing timestamps, equal column
/// lengths and finite values. The wind column may be absent; fitting a
/// linear model on such a series fails because the exogenous regressor is
/// required.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    timestamps: Vec<DateTime<Utc>>,
    wave_height: Vec<f64>,
    wind_speed: Option<Vec<f64>>,
}

/// Chronological train / validation / test partition.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesSplit {
    pub train: TimeSeries,
    pub validation: Option<TimeSeries>,
    pub test: TimeSeries,
}

impl TimeSeries {
    /// Create a series with both columns.
    pub fn new(
        timestamps: Vec<DateTime<Utc>>,
        wave_height: Vec<f64>,
        wind_speed: Vec<f64>,
    ) -> Result<Self> {
        Self::build(timestamps, wave_height, Some(wind_speed))
    }

    /// Create a series that carries no wind-speed column.
    pub fn without_exogenous(timestamps: Vec<DateTime<Utc>>, wave_height: Vec<f64>) -> Result<Self> {
        Self::build(timestamps, wave_height, None)
    }

    fn build(
        timestamps: Vec<DateTime<Utc>>,
        wave_height: Vec<f64>,
        wind_speed: Option<Vec<f64>>,
    ) -> Result<Self> {
        for i in 1..timestamps.len() {
            if timestamps[i] <= timestamps[i - 1] {
                return Err(ForecastError::InvalidParameter(format!(
                    "timestamps must be strictly increasing (index {i})"
                )));
            }
        }

        if wave_height.len() != timestamps.len() {
            return Err(ForecastError::shape(
                "wave_height column",
                timestamps.len(),
                wave_height.len(),
            ));
        }
        if let Some(wind) = &wind_speed {
            if wind.len() != timestamps.len() {
                return Err(ForecastError::shape(
                    "wind_speed column",
                    timestamps.len(),
                    wind.len(),
                ));
            }
        }

        let columns = std::iter::once(("wave_height", wave_height.as_slice()))
            .chain(wind_speed.as_deref().map(|w| ("wind_speed", w)));
        for (name, column) in columns {
            if let Some(index) = column.iter().position(|v| !v.is_finite()) {
                return Err(ForecastError::InvalidParameter(format!(
                    "{name} must be finite (index {index})"
                )));
            }
        }

        Ok(Self {
            timestamps,
            wave_height,
            wind_speed,
        })
    }

    /// Number of observations.
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    pub fn wave_height(&self) -> &[f64] {
        &self.wave_height
    }

    /// Wind-speed column, if present.
    pub fn wind_speed(&self) -> Option<&[f64]> {
        self.wind_speed.as_deref()
    }

    /// Wind-speed column or a fit failure naming the missing regressor.
    pub fn require_wind_speed(&self) -> Result<&[f64]> {
        self.wind_speed().ok_or_else(|| {
            ForecastError::fit("exogenous input", "wind_speed column is missing")
        })
    }

    /// Copy of the observations in `range`.
    pub fn slice(&self, range: Range<usize>) -> Result<Self> {
        if range.start > range.end || range.end > self.len() {
            return Err(ForecastError::InvalidParameter(format!(
                "slice {}..{} out of bounds for series of length {}",
                range.start,
                range.end,
                self.len()
            )));
        }
        Ok(Self {
            timestamps: self.timestamps[range.clone()].to_vec(),
            wave_height: self.wave_height[range.clone()].to_vec(),
            wind_speed: self.wind_speed.as_ref().map(|w| w[range].to_vec()),
        })
    }

    /// Split chronologically into train and test, `train_ratio` of the
    /// observations going to training.
    pub fn split_train_test(&self, train_ratio: f64) -> Result<SeriesSplit> {
        check_ratio("train_ratio", train_ratio)?;
        let n_train = (self.len() as f64 * train_ratio).floor() as usize;
        self.split_at(n_train, n_train)
    }

    /// Split chronologically into train, validation and test.
    pub fn split_train_validation_test(
        &self,
        train_ratio: f64,
        validation_ratio: f64,
    ) -> Result<SeriesSplit> {
        check_ratio("train_ratio", train_ratio)?;
        check_ratio("validation_ratio", validation_ratio)?;
        if train_ratio + validation_ratio >= 1.0 {
            return Err(ForecastError::InvalidParameter(
                "train_ratio + validation_ratio must leave room for a test set".to_string(),
            ));
        }
        let n = self.len() as f64;
        let n_train = (n * train_ratio).floor() as usize;
        let n_val = (n * validation_ratio).floor() as usize;
        self.split_at(n_train, n_train + n_val)
    }

    fn split_at(&self, train_end: usize, validation_end: usize) -> Result<SeriesSplit> {
        let train = self.slice(0..train_end)?;
        let validation = if validation_end > train_end {
            Some(self.slice(train_end..validation_end)?)
        } else {
            None
        };
        let test = self.slice(validation_end..self.len())?;
        if train.is_empty() || test.is_empty() {
            return Err(ForecastError::InsufficientData {
                needed: 2,
                got: self.len(),
            });
        }
        Ok(SeriesSplit {
            train,
            validation,
            test,
        })
    }
}

fn check_ratio(name: &str, ratio: f64) -> Result<()> {
    if !(ratio > 0.0 && ratio < 1.0) {
        return Err(ForecastError::InvalidParameter(format!(
            "{name} must be in (0, 1), got {ratio}"
        )));
    }
    Ok(())
}
