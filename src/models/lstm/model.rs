//! A trained residual network paired with its scaler.

use crate::error::{ForecastError, Result};
use crate::models::lstm::iterative::predict_iterative;
use crate::models::lstm::network::LstmNetwork;
use crate::transform::MinMaxScaler;
use serde::{Deserialize, Serialize};

/// Network weights and the min-max transform fitted on its training
/// residuals. The two are only ever replaced together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResidualModel {
    network: LstmNetwork,
    scaler: MinMaxScaler,
    window: usize,
}

impl ResidualModel {
    pub fn new(network: LstmNetwork, scaler: MinMaxScaler, window: usize) -> Self {
        Self {
            network,
            scaler,
            window,
        }
    }

    pub fn network(&self) -> &LstmNetwork {
        &self.network
    }

    pub fn scaler(&self) -> &MinMaxScaler {
        &self.scaler
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Scaled last `window` values of `residuals`.
    pub fn seed_window(&self, residuals: &[f64]) -> Result<Vec<f64>> {
        if residuals.len() < self.window {
            return Err(ForecastError::InsufficientData {
                needed: self.window,
                got: residuals.len(),
            });
        }
        Ok(self
            .scaler
            .transform(&residuals[residuals.len() - self.window..]))
    }

    /// Unscaled one-step prediction from raw residuals.
    pub fn predict_one(&self, residuals: &[f64]) -> Result<f64> {
        let window = self.seed_window(residuals)?;
        Ok(self.scaler.inverse_value(self.network.predict(&window)))
    }

    /// Closed-loop residual forecast from a scaled seed window.
    pub fn predict_iterative(&self, seed_window: &[f64], n_steps: usize) -> Result<Vec<f64>> {
        predict_iterative(&self.network, &self.scaler, seed_window, n_steps, self.window)
    }
}
