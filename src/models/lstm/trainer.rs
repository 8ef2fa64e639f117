//! Seeded mini-batch training with early stopping.

use crate::config::ResidualHyperparameters;
use crate::error::{ForecastError, Result};
use crate::models::lstm::adam::Adam;
use crate::models::lstm::model::ResidualModel;
use crate::models::lstm::network::LstmNetwork;
use crate::transform::{build_sequences, MinMaxScaler, SequencePair};
use crate::utils::CancellationToken;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// Per-epoch record of a training run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingHistory {
    /// Mean batch loss per epoch.
    pub losses: Vec<f64>,
    /// Validation loss per epoch, empty without validation data.
    pub val_losses: Vec<f64>,
    pub epochs_trained: usize,
    pub early_stopped: bool,
    /// One-based epoch whose weights were kept.
    pub best_epoch: Option<usize>,
}

/// Output of [`ResidualTrainer::train`].
#[derive(Debug, Clone, PartialEq)]
pub struct TrainedResidual {
    pub model: ResidualModel,
    pub history: TrainingHistory,
    pub seed: u64,
}

/// Trains the residual network.
///
/// Weight initialization and batch shuffling both draw from one RNG seeded
/// with `seed`, so identical inputs give identical weights.
#[derive(Debug, Clone)]
pub struct ResidualTrainer {
    hyperparameters: ResidualHyperparameters,
    epochs: usize,
    seed: u64,
    cancel: CancellationToken,
}

impl ResidualTrainer {
    /// Trainer with the full epoch budget.
    pub fn new(hyperparameters: ResidualHyperparameters, seed: u64) -> Self {
        let epochs = hyperparameters.max_epochs;
        Self {
            hyperparameters,
            epochs,
            seed,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Fit the scaler on `residuals`, then train on their sliding windows.
    ///
    /// Validation residuals are scaled with the training scaler and
    /// prefixed by the last `window` training residuals, so every
    /// validation value is a target. The monitored loss is validation loss
    /// when given, training loss otherwise; the best epoch's weights are
    /// always restored.
    #[instrument(skip_all, fields(seed = self.seed, epochs = self.epochs, n = residuals.len()))]
    pub fn train(&self, residuals: &[f64], validation: Option<&[f64]>) -> Result<TrainedResidual> {
        let hp = &self.hyperparameters;
        hp.validate()?;
        let window = hp.window;
        if residuals.len() <= window {
            return Err(ForecastError::EmptyData(format!(
                "{} residuals leave no training pairs for window {window}",
                residuals.len()
            )));
        }

        let (scaler, scaled) = MinMaxScaler::fit_transform(residuals)?;
        let pairs = build_sequences(&scaled, window)?;

        let validation_values = match validation.filter(|v| !v.is_empty()) {
            Some(values) => {
                let mut joined = scaled[scaled.len() - window..].to_vec();
                joined.extend(scaler.transform(values));
                Some(joined)
            }
            None => None,
        };
        let validation_pairs = match &validation_values {
            Some(values) => Some(build_sequences(values, window)?),
            None => None,
        };

        if scaler.is_degenerate() {
            debug!("constant residuals, emitting the training value");
            let network = LstmNetwork::constant(hp.hidden_units, scaled[0]);
            return Ok(TrainedResidual {
                model: ResidualModel::new(network, scaler, window),
                history: TrainingHistory::default(),
                seed: self.seed,
            });
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut network = LstmNetwork::new(hp.hidden_units, &mut rng);
        let mut optimizer = Adam::new(network.num_parameters(), hp.learning_rate);
        let mut grads = vec![0.0; network.num_parameters()];
        let mut order: Vec<usize> = (0..pairs.len()).collect();

        let mut history = TrainingHistory::default();
        let mut best_params = network.params().to_vec();
        let mut best_loss = f64::INFINITY;
        let mut wait = 0;

        for epoch in 0..self.epochs {
            self.cancel
                .check(|| format!("residual training (seed {}, epoch {})", self.seed, epoch + 1))?;

            order.shuffle(&mut rng);
            let mut loss_sum = 0.0;
            let mut batches = 0;
            for batch in order.chunks(hp.batch_size) {
                grads.iter_mut().for_each(|g| *g = 0.0);
                let scale = 1.0 / batch.len() as f64;
                let mut batch_loss = 0.0;
                for &idx in batch {
                    let pair = &pairs[idx];
                    let cache = network.forward(pair.input);
                    let err = cache.output - pair.target;
                    batch_loss += err * err * scale;
                    network.backward(pair.input, &cache, 2.0 * err * scale, &mut grads);
                }
                optimizer.update(network.params_mut(), &grads);
                loss_sum += batch_loss;
                batches += 1;
            }

            let train_loss = loss_sum / batches as f64;
            if !train_loss.is_finite() {
                return Err(ForecastError::fit(
                    format!("residual training (seed {}, epoch {})", self.seed, epoch + 1),
                    "training loss is not finite",
                ));
            }
            history.losses.push(train_loss);
            history.epochs_trained = epoch + 1;

            let monitored = match &validation_pairs {
                Some(val) => {
                    let loss = mean_squared_error(&network, val);
                    history.val_losses.push(loss);
                    loss
                }
                None => train_loss,
            };

            if monitored < best_loss {
                best_loss = monitored;
                best_params.copy_from_slice(network.params());
                history.best_epoch = Some(epoch + 1);
                wait = 0;
            } else {
                wait += 1;
                if wait >= hp.patience {
                    history.early_stopped = true;
                    break;
                }
            }
        }

        network.params_mut().copy_from_slice(&best_params);
        debug!(
            epochs = history.epochs_trained,
            best_epoch = ?history.best_epoch,
            best_loss,
            early_stopped = history.early_stopped,
            "residual training finished"
        );

        Ok(TrainedResidual {
            model: ResidualModel::new(network, scaler, window),
            history,
            seed: self.seed,
        })
    }
}

impl ResidualTrainer {
    /// A model that forecasts a zero residual, so the hybrid forecast
    /// equals the linear one. No gradient step is taken.
    ///
    /// The scaler is still fitted on `residuals`, which keeps the seed
    /// window of a [`ResidualModel`] well defined.
    pub fn zero_residual(&self, residuals: &[f64]) -> Result<TrainedResidual> {
        let hp = &self.hyperparameters;
        hp.validate()?;
        if residuals.len() < hp.window {
            return Err(ForecastError::InsufficientData {
                needed: hp.window,
                got: residuals.len(),
            });
        }
        let scaler = MinMaxScaler::fit(residuals)?;
        let network = LstmNetwork::constant(hp.hidden_units, scaler.transform_value(0.0));
        Ok(TrainedResidual {
            model: ResidualModel::new(network, scaler, hp.window),
            history: TrainingHistory::default(),
            seed: self.seed,
        })
    }
}

fn mean_squared_error(network: &LstmNetwork, pairs: &[SequencePair<'_>]) -> f64 {
    let total: f64 = pairs
        .iter()
        .map(|p| (network.predict(p.input) - p.target).powi(2))
        .sum();
    total / pairs.len() as f64
}
