//! Data transformations for the residual forecaster.
//!
//! Residuals are min-max scaled with parameters fitted on the training
//! residuals only, then cut into sliding windows.
//!
//! # Example
//!
//! ```
//! use wavecast::transform::{build_sequences, MinMaxScaler};
//!
//! let residuals = vec![0.3, -0.2, 0.1, 0.4, -0.1];
//! let (scaler, scaled) = MinMaxScaler::fit_transform(&residuals).unwrap();
//! let pairs = build_sequences(&scaled, 3).unwrap();
//!
//! assert_eq!(pairs.len(), 2);
//! assert!((scaler.inverse_value(pairs[0].target) - 0.4).abs() < 1e-12);
//! ```

pub mod scale;
pub mod window;

pub use scale::MinMaxScaler;
pub use window::{build_sequences, SequencePair};
