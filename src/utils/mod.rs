//! Utility functions shared by the linear and residual models.

pub mod cancel;
pub mod metrics;
pub mod ols;
pub mod optimization;
pub mod stats;

pub use cancel::CancellationToken;
pub use metrics::{calculate_metrics, mape, AccuracyMetrics};
pub use ols::{invert_symmetric, least_squares, solve_symmetric};
pub use optimization::{minimize_with_restarts, nelder_mead, Minimum, SimplexOptions};
pub use stats::normal_two_sided_p_value;
