//! Pipeline configuration.
//!
//! Every recognised option lives in one of three structures with a
//! hardcoded default. [`ConfigOverrides`] carries partial settings from a
//! caller or from saved model metadata; [`HybridConfig::resolve`] merges
//! them with precedence explicit > saved > default.

use crate::error::{ForecastError, Result};
use crate::models::arimax::ArimaxOrder;
use serde::{Deserialize, Serialize};

/// Residual forecaster settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResidualHyperparameters {
    /// Input window length W.
    pub window: usize,
    pub hidden_units: usize,
    /// Epoch budget for a full training run.
    pub max_epochs: usize,
    /// Reduced epoch budget used while searching seeds.
    pub search_epochs: usize,
    pub batch_size: usize,
    /// Epochs without improvement before early stopping.
    pub patience: usize,
    pub learning_rate: f64,
}

impl Default for ResidualHyperparameters {
    fn default() -> Self {
        Self {
            window: 12,
            hidden_units: 18,
            max_epochs: 200,
            search_epochs: 50,
            batch_size: 16,
            patience: 10,
            learning_rate: 0.001,
        }
    }
}

impl ResidualHyperparameters {
    pub fn with_window(mut self, window: usize) -> Self {
        self.window = window;
        self
    }

    pub fn with_hidden_units(mut self, hidden_units: usize) -> Self {
        self.hidden_units = hidden_units;
        self
    }

    /// Set both the full and the search epoch budgets.
    pub fn with_epochs(mut self, max_epochs: usize, search_epochs: usize) -> Self {
        self.max_epochs = max_epochs;
        self.search_epochs = search_epochs;
        self
    }

    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    pub fn with_patience(mut self, patience: usize) -> Self {
        self.patience = patience;
        self
    }

    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("window", self.window),
            ("hidden_units", self.hidden_units),
            ("max_epochs", self.max_epochs),
            ("search_epochs", self.search_epochs),
            ("batch_size", self.batch_size),
        ];
        if let Some((name, _)) = positive.iter().find(|(_, v)| *v == 0) {
            return Err(ForecastError::InvalidParameter(format!(
                "{name} must be positive"
            )));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(ForecastError::InvalidParameter(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        Ok(())
    }
}

/// Seed search policy.
///
/// The thresholds are tunable, not derived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedSearchPolicy {
    /// Candidate seeds in priority order. The first is the fallback when
    /// every candidate fails.
    pub seeds: Vec<u64>,
    /// Stop as soon as a candidate's hybrid MAPE is at most the baseline.
    pub early_exit_le_baseline: bool,
    /// Trials to run before the abandon rule may fire.
    pub min_trials_before_abandon: usize,
    /// Abandon when every trial so far exceeds `baseline * (1 + margin)`.
    pub abandon_margin: f64,
    /// Keep a full retrain only if it is within this relative margin of the
    /// quick-search score.
    pub regression_tolerance: f64,
}

impl Default for SeedSearchPolicy {
    fn default() -> Self {
        Self {
            seeds: vec![42, 7, 123, 2024, 1, 99, 314, 777],
            early_exit_le_baseline: true,
            min_trials_before_abandon: 8,
            abandon_margin: 0.10,
            regression_tolerance: 0.05,
        }
    }
}

impl SeedSearchPolicy {
    pub fn with_seeds(mut self, seeds: Vec<u64>) -> Self {
        self.seeds = seeds;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.seeds.is_empty() {
            return Err(ForecastError::InvalidParameter(
                "seed list must not be empty".to_string(),
            ));
        }
        for (name, value) in [
            ("abandon_margin", self.abandon_margin),
            ("regression_tolerance", self.regression_tolerance),
        ] {
            if !(value >= 0.0 && value.is_finite()) {
                return Err(ForecastError::InvalidParameter(format!(
                    "{name} must be non-negative, got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// Complete configuration for one hybrid training run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HybridConfig {
    pub order: ArimaxOrder,
    pub hyperparameters: ResidualHyperparameters,
    pub policy: SeedSearchPolicy,
}

impl HybridConfig {
    pub fn new(order: ArimaxOrder) -> Self {
        Self {
            order,
            ..Default::default()
        }
    }

    pub fn with_hyperparameters(mut self, hyperparameters: ResidualHyperparameters) -> Self {
        self.hyperparameters = hyperparameters;
        self
    }

    pub fn with_policy(mut self, policy: SeedSearchPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.hyperparameters.validate()?;
        self.policy.validate()
    }

    /// Merge partial settings field by field: `explicit`, then `saved`,
    /// then the default. The result is validated.
    ///
    /// # Example
    /// ```
    /// use wavecast::config::{ConfigOverrides, HybridConfig};
    ///
    /// let explicit = ConfigOverrides { window: Some(24), ..Default::default() };
    /// let saved = ConfigOverrides { window: Some(6), hidden_units: Some(32), ..Default::default() };
    ///
    /// let config = HybridConfig::resolve(&explicit, &saved).unwrap();
    /// assert_eq!(config.hyperparameters.window, 24);
    /// assert_eq!(config.hyperparameters.hidden_units, 32);
    /// assert_eq!(config.hyperparameters.batch_size, 16);
    /// ```
    pub fn resolve(explicit: &ConfigOverrides, saved: &ConfigOverrides) -> Result<Self> {
        let defaults = Self::default();
        let hp = defaults.hyperparameters;
        let policy = defaults.policy;

        macro_rules! pick {
            ($field:ident, $default:expr) => {
                explicit
                    .$field
                    .clone()
                    .or_else(|| saved.$field.clone())
                    .unwrap_or($default)
            };
        }

        let config = Self {
            order: pick!(order, defaults.order),
            hyperparameters: ResidualHyperparameters {
                window: pick!(window, hp.window),
                hidden_units: pick!(hidden_units, hp.hidden_units),
                max_epochs: pick!(max_epochs, hp.max_epochs),
                search_epochs: pick!(search_epochs, hp.search_epochs),
                batch_size: pick!(batch_size, hp.batch_size),
                patience: pick!(patience, hp.patience),
                learning_rate: pick!(learning_rate, hp.learning_rate),
            },
            policy: SeedSearchPolicy {
                seeds: pick!(seeds, policy.seeds),
                early_exit_le_baseline: pick!(early_exit_le_baseline, policy.early_exit_le_baseline),
                min_trials_before_abandon: pick!(
                    min_trials_before_abandon,
                    policy.min_trials_before_abandon
                ),
                abandon_margin: pick!(abandon_margin, policy.abandon_margin),
                regression_tolerance: pick!(regression_tolerance, policy.regression_tolerance),
            },
        };
        config.validate()?;
        Ok(config)
    }
}

/// Partial configuration; `None` defers to the next source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigOverrides {
    pub order: Option<ArimaxOrder>,
    pub window: Option<usize>,
    pub hidden_units: Option<usize>,
    pub max_epochs: Option<usize>,
    pub search_epochs: Option<usize>,
    pub batch_size: Option<usize>,
    pub patience: Option<usize>,
    pub learning_rate: Option<f64>,
    pub seeds: Option<Vec<u64>>,
    pub early_exit_le_baseline: Option<bool>,
    pub min_trials_before_abandon: Option<usize>,
    pub abandon_margin: Option<f64>,
    pub regression_tolerance: Option<f64>,
}

impl ConfigOverrides {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
