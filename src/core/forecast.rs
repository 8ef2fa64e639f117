//! Hybrid forecast output.

use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};

/// One future step of a hybrid forecast.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastStep {
    /// Zero-based offset past the end of the training series.
    pub step: usize,
    pub linear: f64,
    pub residual: f64,
    /// `linear + residual`.
    pub hybrid: f64,
}

/// Per-step linear, residual and combined predictions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    steps: Vec<ForecastStep>,
}

impl ForecastResult {
    /// Combine linear and residual predictions step by step.
    pub fn combine(linear: &[f64], residual: &[f64]) -> Result<Self> {
        if linear.len() != residual.len() {
            return Err(ForecastError::shape(
                "residual forecast",
                linear.len(),
                residual.len(),
            ));
        }
        let steps = linear
            .iter()
            .zip(residual)
            .enumerate()
            .map(|(step, (&linear, &residual))| ForecastStep {
                step,
                linear,
                residual,
                hybrid: linear + residual,
            })
            .collect();
        Ok(Self { steps })
    }

    pub fn horizon(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn steps(&self) -> &[ForecastStep] {
        &self.steps
    }

    pub fn linear(&self) -> Vec<f64> {
        self.steps.iter().map(|s| s.linear).collect()
    }

    pub fn residual(&self) -> Vec<f64> {
        self.steps.iter().map(|s| s.residual).collect()
    }

    pub fn hybrid(&self) -> Vec<f64> {
        self.steps.iter().map(|s| s.hybrid).collect()
    }

    /// Drop the first `offset` steps, renumbering the rest from zero.
    pub fn skip(&self, offset: usize) -> Self {
        let steps = self
            .steps
            .iter()
            .skip(offset)
            .enumerate()
            .map(|(step, s)| ForecastStep { step, ..*s })
            .collect();
        Self { steps }
    }
}
