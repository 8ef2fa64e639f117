//! Core data structures for wave-height forecasting.

mod forecast;
mod time_series;

pub use forecast::{ForecastResult, ForecastStep};
pub use time_series::{SeriesSplit, TimeSeries};
