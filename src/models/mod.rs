//! Linear and residual forecasting models.

mod traits;

pub mod arimax;
pub mod lstm;

pub use traits::SequenceModel;
