//! Trait seam between the iterative predictor and concrete networks.

use crate::models::lstm::LstmNetwork;

/// A model mapping a window of scaled values to the next scaled value.
///
/// The iterative predictor only needs this, so tests can substitute a
/// cheap deterministic model for a trained network.
pub trait SequenceModel {
    fn predict_next(&self, window: &[f64]) -> f64;
}

impl SequenceModel for LstmNetwork {
    fn predict_next(&self, window: &[f64]) -> f64 {
        self.predict(window)
    }
}
