//! Statistical checks around the linear model.
//!
//! # Example
//!
//! ```
//! use wavecast::validation::{adf_test, ljung_box, normality_check};
//!
//! let residuals = vec![0.1, -0.2, 0.15, -0.1, 0.05, -0.08, 0.12, -0.15, 0.1, -0.05];
//! let lb = ljung_box(&residuals, Some(3), 0);
//! assert!(lb.statistic >= 0.0);
//!
//! let moments = normality_check(&residuals);
//! assert!(moments.skewness.is_finite());
//!
//! let adf = adf_test(&residuals, Some(1));
//! assert!(adf.p_value >= 0.0 && adf.p_value <= 1.0);
//! ```

pub mod residual_tests;
pub mod stationarity;

pub use residual_tests::{ljung_box, normality_check, LjungBoxResult, NormalityCheck};
pub use stationarity::{adf_test, suggest_differencing, CriticalValues, StationarityResult};
