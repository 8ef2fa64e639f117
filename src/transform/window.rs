//! Sliding-window supervised pairs for the residual forecaster.

use crate::error::{ForecastError, Result};

/// A window of consecutive values and the value that follows it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SequencePair<'a> {
    pub input: &'a [f64],
    pub target: f64,
}

/// Build `(values[i..i+window], values[i+window])` pairs.
///
/// A series of length `L` yields exactly `L - window` pairs in order.
/// Fails with [`ForecastError::InsufficientData`] when `L <= window` and
/// with [`ForecastError::InvalidParameter`] for a zero window.
///
/// # Example
/// ```
/// use wavecast::transform::build_sequences;
///
/// let values = [0.1, 0.2, 0.3, 0.4];
/// let pairs = build_sequences(&values, 2).unwrap();
/// assert_eq!(pairs.len(), 2);
/// assert_eq!(pairs[1].input, &[0.2, 0.3]);
/// assert_eq!(pairs[1].target, 0.4);
/// ```
pub fn build_sequences(values: &[f64], window: usize) -> Result<Vec<SequencePair<'_>>> {
    if window == 0 {
        return Err(ForecastError::InvalidParameter(
            "window must be positive".to_string(),
        ));
    }
    if values.len() <= window {
        return Err(ForecastError::InsufficientData {
            needed: window + 1,
            got: values.len(),
        });
    }

    Ok(values
        .windows(window + 1)
        .map(|w| SequencePair {
            input: &w[..window],
            target: w[window],
        })
        .collect())
}
