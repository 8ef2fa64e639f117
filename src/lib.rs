//! # wavecast
//!
//! Hybrid wave-height forecasting: an ARIMAX model driven by wind speed
//! captures the linear response, and a small LSTM trained on the ARIMAX
//! residuals corrects what the linear model misses.
//!
//! The crate covers ARIMAX fitting, diagnostics and order selection,
//! seeded residual training with early stopping, closed-loop residual
//! forecasting, the seed search that pairs the two, and a serializable
//! [`hybrid::ModelSet`] snapshot for serving.
//!
//! # Example
//!
//! ```no_run
//! use chrono::{Duration, TimeZone, Utc};
//! use wavecast::prelude::*;
//!
//! let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
//! let n = 300;
//! let timestamps = (0..n).map(|i| base + Duration::hours(i)).collect();
//! let wind: Vec<f64> = (0..n).map(|i| 8.0 + 3.0 * (i as f64 * 0.1).sin()).collect();
//! let wave: Vec<f64> = wind.iter().map(|w| 0.5 + 0.2 * w).collect();
//! let series = TimeSeries::new(timestamps, wave, wind).unwrap();
//!
//! let split = series.split_train_validation_test(0.7, 0.15).unwrap();
//! let report = HybridOrchestrator::new(HybridConfig::new(ArimaxOrder::new(1, 0, 0)))
//!     .train_and_evaluate(&split.train, split.validation.as_ref(), &split.test)
//!     .unwrap();
//! println!("ARIMAX {:.2}% vs hybrid {:.2}%", report.arimax_mape, report.hybrid_mape);
//!
//! // `report.model_set` was fitted on `train` only, so its forecast starts
//! // inside the validation segment. Refit on the full history with the
//! // winning seed before forecasting past the data.
//! let config = HybridConfig::new(ArimaxOrder::new(1, 0, 0));
//! let linear = ModelSet::fit_linear(&series, config.order).unwrap();
//! let (live, _) =
//!     ModelSet::fit_residual(linear, &config.hyperparameters, report.seed, None).unwrap();
//! let forecast = live.forecast(24, Some(&[9.0; 24][..])).unwrap();
//! assert_eq!(forecast.horizon(), 24);
//! ```

#![allow(clippy::needless_range_loop)]

pub mod config;
pub mod core;
pub mod error;
pub mod hybrid;
pub mod models;
pub mod simd;
pub mod transform;
pub mod utils;
pub mod validation;

pub use error::{ForecastError, Result};

pub mod prelude {
    pub use crate::config::{ConfigOverrides, HybridConfig, ResidualHyperparameters, SeedSearchPolicy};
    pub use crate::core::{ForecastResult, TimeSeries};
    pub use crate::error::{ForecastError, Result};
    pub use crate::hybrid::{HybridOrchestrator, HybridReport, ModelSet};
    pub use crate::models::arimax::{diagnose, ArimaxOrder, FittedArimax, ModelSelector};
    pub use crate::models::lstm::{ResidualModel, ResidualTrainer};
    pub use crate::utils::{calculate_metrics, AccuracyMetrics, CancellationToken};
}
