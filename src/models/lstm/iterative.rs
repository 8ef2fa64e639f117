//! Closed-loop multi-step residual forecasting.
//!
//! Each scaled prediction is appended to the input window and the oldest
//! value dropped, so step `k` sees the model's own outputs for the last
//! `min(k, W)` positions rather than ground truth.

use crate::error::{ForecastError, Result};
use crate::models::traits::SequenceModel;
use crate::transform::MinMaxScaler;

/// Fixed-width sliding window over a reused arena.
///
/// Every value is written twice, `width` slots apart, so the current
/// window is always one contiguous slice and pushes never allocate.
#[derive(Debug, Clone)]
pub struct WindowBuffer {
    arena: Vec<f64>,
    head: usize,
    width: usize,
}

impl WindowBuffer {
    pub fn new(seed: &[f64]) -> Self {
        let mut arena = Vec::with_capacity(2 * seed.len());
        arena.extend_from_slice(seed);
        arena.extend_from_slice(seed);
        Self {
            arena,
            head: 0,
            width: seed.len(),
        }
    }

    /// Oldest to newest.
    pub fn as_slice(&self) -> &[f64] {
        &self.arena[self.head..self.head + self.width]
    }

    /// Drop the oldest value and append `value`.
    pub fn push(&mut self, value: f64) {
        if self.width == 0 {
            return;
        }
        self.arena[self.head] = value;
        self.arena[self.head + self.width] = value;
        self.head = (self.head + 1) % self.width;
    }
}

/// Forecast `n_steps` unscaled residuals by feeding predictions back.
///
/// `seed_window` holds the last `window` scaled residuals. The outputs are
/// inverse-transformed with `scaler`, which must be the one the model was
/// trained with. `n_steps == 0` returns an empty vector without calling
/// the model.
pub fn predict_iterative<M: SequenceModel + ?Sized>(
    model: &M,
    scaler: &MinMaxScaler,
    seed_window: &[f64],
    n_steps: usize,
    window: usize,
) -> Result<Vec<f64>> {
    if window == 0 {
        return Err(ForecastError::InvalidParameter(
            "window must be positive".to_string(),
        ));
    }
    if seed_window.len() != window {
        return Err(ForecastError::shape(
            "iterative seed window",
            window,
            seed_window.len(),
        ));
    }
    if n_steps == 0 {
        return Ok(Vec::new());
    }

    let mut buffer = WindowBuffer::new(seed_window);
    let mut scaled = Vec::with_capacity(n_steps);
    for _ in 0..n_steps {
        let next = model.predict_next(buffer.as_slice());
        scaled.push(next);
        buffer.push(next);
    }
    Ok(scaler.inverse_transform(&scaled))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::cell::{Cell, RefCell};

    /// Predicts the window mean and records every window it sees.
    struct MeanModel {
        calls: Cell<usize>,
        seen: RefCell<Vec<Vec<f64>>>,
    }

    impl MeanModel {
        fn new() -> Self {
            Self {
                calls: Cell::new(0),
                seen: RefCell::new(Vec::new()),
            }
        }
    }

    impl SequenceModel for MeanModel {
        fn predict_next(&self, window: &[f64]) -> f64 {
            self.calls.set(self.calls.get() + 1);
            self.seen.borrow_mut().push(window.to_vec());
            window.iter().sum::<f64>() / window.len() as f64
        }
    }

    fn unit_scaler() -> MinMaxScaler {
        MinMaxScaler::fit(&[0.0, 1.0]).unwrap()
    }

    #[test]
    fn zero_steps_never_calls_model() {
        let model = MeanModel::new();
        let out = predict_iterative(&model, &unit_scaler(), &[0.1, 0.2, 0.3], 0, 3).unwrap();

        assert!(out.is_empty());
        assert_eq!(model.calls.get(), 0);
    }

    #[test]
    fn predictions_feed_back_into_window() {
        let model = MeanModel::new();
        let out = predict_iterative(&model, &unit_scaler(), &[0.0, 0.3, 0.6], 3, 3).unwrap();

        assert_eq!(model.calls.get(), 3);
        assert_relative_eq!(out[0], 0.3, epsilon = 1e-12);
        let seen = model.seen.borrow();
        assert_eq!(seen[1].len(), 3);
        assert_relative_eq!(seen[1][0], 0.3, epsilon = 1e-12);
        assert_relative_eq!(seen[1][2], out[0], epsilon = 1e-12);
        assert_relative_eq!(seen[2][1], out[0], epsilon = 1e-12);
        assert_relative_eq!(seen[2][2], out[1], epsilon = 1e-12);
    }

    #[test]
    fn outputs_are_inverse_transformed() {
        let scaler = MinMaxScaler::fit(&[-2.0, 2.0]).unwrap();
        let model = MeanModel::new();
        let out = predict_iterative(&model, &scaler, &[0.75, 0.75], 2, 2).unwrap();

        assert_relative_eq!(out[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(out[1], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn seed_window_length_must_match() {
        let model = MeanModel::new();
        assert!(matches!(
            predict_iterative(&model, &unit_scaler(), &[0.1, 0.2], 5, 3),
            Err(ForecastError::ShapeMismatch {
                expected: 3,
                got: 2,
                ..
            })
        ));
    }

    #[test]
    fn repeated_calls_are_identical() {
        let model = MeanModel::new();
        let seed = [0.2, 0.9, 0.4, 0.1];
        let a = predict_iterative(&model, &unit_scaler(), &seed, 10, 4).unwrap();
        let b = predict_iterative(&model, &unit_scaler(), &seed, 10, 4).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn window_buffer_slides() {
        let mut buffer = WindowBuffer::new(&[1.0, 2.0, 3.0]);
        assert_eq!(buffer.as_slice(), &[1.0, 2.0, 3.0]);
        buffer.push(4.0);
        assert_eq!(buffer.as_slice(), &[2.0, 3.0, 4.0]);
        buffer.push(5.0);
        buffer.push(6.0);
        assert_eq!(buffer.as_slice(), &[4.0, 5.0, 6.0]);
        buffer.push(7.0);
        assert_eq!(buffer.as_slice(), &[5.0, 6.0, 7.0]);
    }
}
