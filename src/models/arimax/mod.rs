//! Linear forecaster: ARIMAX with wind speed as the exogenous regressor.
//!
//! # Example
//!
//! ```
//! use chrono::{Duration, TimeZone, Utc};
//! use wavecast::core::TimeSeries;
//! use wavecast::models::arimax::{diagnose, ArimaxOrder, FittedArimax};
//!
//! let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
//! let timestamps = (0..60).map(|i| base + Duration::hours(i)).collect();
//! let wind: Vec<f64> = (0..60).map(|i| 5.0 + (i as f64 * 0.4).sin()).collect();
//! let wave: Vec<f64> = wind.iter().enumerate()
//!     .map(|(i, w)| 1.0 + 0.3 * w + 0.05 * (i as f64 * 1.7).cos())
//!     .collect();
//! let series = TimeSeries::new(timestamps, wave, wind).unwrap();
//!
//! let model = FittedArimax::fit(&series, ArimaxOrder::new(1, 0, 0)).unwrap();
//! let forecast = model.forecast(3, &[5.0, 5.5, 6.0]).unwrap();
//! assert_eq!(forecast.len(), 3);
//!
//! let diagnostics = diagnose(&model);
//! assert!(diagnostics.stable);
//! ```

pub mod diagnostics;
pub mod diff;
mod model;
pub mod selection;

pub use diagnostics::{diagnose, residual_report, Diagnostics, ResidualReport};
pub use model::{ArimaxCoefficients, ArimaxOrder, FittedArimax, ParameterEstimate};
pub use selection::{evaluate_order, ModelEvaluation, ModelSelector};
