//! Hybrid training: ARIMAX fit, residual seed search and guarded retrain.

use crate::config::HybridConfig;
use crate::core::{ForecastResult, TimeSeries};
use crate::error::{ForecastError, Result};
use crate::hybrid::model_set::{forecast_residuals, ModelSet};
use crate::hybrid::seed_search::{guarded_retrain, run_seed_search, StopReason, TrialRecord};
use crate::models::arimax::FittedArimax;
use crate::models::lstm::{ResidualTrainer, TrainedResidual, TrainingHistory};
use crate::utils::metrics::mape;
use crate::utils::CancellationToken;
use tracing::{info, instrument, warn};

/// Result of [`HybridOrchestrator::train_and_evaluate`].
///
/// Both MAPE values are measured on the same test segment.
#[derive(Debug, Clone, PartialEq)]
pub struct HybridReport {
    pub model_set: ModelSet,
    pub arimax_mape: f64,
    pub hybrid_mape: f64,
    /// Seed of the residual network in `model_set`.
    pub seed: u64,
    /// History of the kept residual network.
    pub history: TrainingHistory,
    pub trials: Vec<TrialRecord<u64>>,
    pub stop_reason: StopReason,
    /// Whether the full-budget retrain replaced the quick-search model.
    pub retrain_kept: bool,
    /// Every seed failed and `model_set` carries a zero-residual model
    /// under the first configured seed.
    pub fell_back: bool,
    /// Linear, residual and hybrid predictions over the test segment.
    pub test_forecast: ForecastResult,
}

/// Test-segment outcome of one residual network.
struct Candidate {
    trained: TrainedResidual,
    hybrid_mape: f64,
    forecast: ForecastResult,
}

/// Fixed inputs shared by every seed trial.
struct Stage<'a> {
    config: &'a HybridConfig,
    cancel: &'a CancellationToken,
    train_residuals: Vec<f64>,
    validation_residuals: Option<Vec<f64>>,
    /// Linear forecast over the test segment.
    test_linear: Vec<f64>,
    test_actual: &'a [f64],
    /// Steps between the end of training and the start of test.
    offset: usize,
}

impl Stage<'_> {
    fn evaluate_seed(&self, seed: u64, epochs: usize) -> Result<Candidate> {
        self.cancel.check(|| format!("seed search (seed {seed})"))?;
        let trained = ResidualTrainer::new(self.config.hyperparameters.clone(), seed)
            .with_epochs(epochs)
            .with_cancellation(self.cancel.clone())
            .train(&self.train_residuals, self.validation_residuals.as_deref())?;
        self.score(trained)
    }

    /// Candidate whose residual forecast is zero.
    fn zero_residual(&self, seed: u64) -> Result<Candidate> {
        let trained = ResidualTrainer::new(self.config.hyperparameters.clone(), seed)
            .zero_residual(&self.train_residuals)?;
        self.score(trained)
    }

    fn score(&self, trained: TrainedResidual) -> Result<Candidate> {
        let seed_window = trained.model.seed_window(&self.train_residuals)?;
        let path = trained
            .model
            .predict_iterative(&seed_window, self.offset + self.test_linear.len())?;
        let forecast = ForecastResult::combine(&self.test_linear, &path[self.offset..])?;
        let hybrid_mape = mape(self.test_actual, &forecast.hybrid())?;

        Ok(Candidate {
            trained,
            hybrid_mape,
            forecast,
        })
    }
}

/// Composes the linear and residual stages.
#[derive(Debug, Clone, Default)]
pub struct HybridOrchestrator {
    config: HybridConfig,
    cancel: CancellationToken,
}

impl HybridOrchestrator {
    pub fn new(config: HybridConfig) -> Self {
        Self {
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Checked between seed trials and between training epochs.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn config(&self) -> &HybridConfig {
        &self.config
    }

    /// Fit ARIMAX on `train`, search residual seeds against the ARIMAX
    /// test MAPE, and retrain the winner with the full epoch budget.
    ///
    /// `validation` and `test` must follow `train` in that order.
    /// Validation residuals only drive early stopping. The retrain is
    /// discarded when it is worse than the quick-search result by more
    /// than `regression_tolerance`. When every seed fails recoverably the
    /// first configured seed gets a zero-residual model, so the hybrid
    /// forecast equals the ARIMAX forecast and `fell_back` is set.
    #[instrument(skip_all, fields(order = %self.config.order, n_train = train.len(), n_test = test.len()))]
    pub fn train_and_evaluate(
        &self,
        train: &TimeSeries,
        validation: Option<&TimeSeries>,
        test: &TimeSeries,
    ) -> Result<HybridReport> {
        if train.is_empty() {
            return Err(ForecastError::DataNotFound("training series".to_string()));
        }
        if test.is_empty() {
            return Err(ForecastError::DataNotFound("test series".to_string()));
        }
        let config = &self.config;
        config.validate()?;

        let linear = FittedArimax::fit(train, config.order)?;
        let segments: Vec<&TimeSeries> = validation.into_iter().chain(Some(test)).collect();
        let mut forecasts = linear.forecast_segments(&segments)?;
        let test_linear = forecasts.pop().unwrap_or_default();
        let validation_residuals = match (validation, forecasts.pop()) {
            (Some(series), Some(forecast)) => Some(forecast_residuals(series.wave_height(), &forecast)),
            _ => None,
        };
        let arimax_mape = mape(test.wave_height(), &test_linear)?;
        info!(arimax_mape, "linear stage fitted");

        let stage = Stage {
            config,
            cancel: &self.cancel,
            train_residuals: linear.residuals(),
            validation_residuals,
            test_linear,
            test_actual: test.wave_height(),
            offset: validation.map_or(0, TimeSeries::len),
        };

        let policy = &config.policy;
        let search_epochs = config.hyperparameters.search_epochs;
        let outcome = run_seed_search(&policy.seeds, arimax_mape, policy, |&seed| {
            stage
                .evaluate_seed(seed, search_epochs)
                .map(|candidate| (candidate.hybrid_mape, candidate))
        })?;

        let (seed, kept, retrain_kept, fell_back) = match outcome.best {
            Some(best) => {
                let seed = best.candidate;
                info!(seed, hybrid_mape = best.value.hybrid_mape, "seed search finished");
                let (kept, retrain_kept) = self.retrain(&stage, seed, best.value)?;
                (seed, kept, retrain_kept, false)
            }
            None => {
                let fallback = policy.seeds[0];
                warn!(
                    seed = fallback,
                    trials = outcome.trials.len(),
                    "every seed failed, falling back to a zero residual model"
                );
                (fallback, stage.zero_residual(fallback)?, false, true)
            }
        };

        let model_set = ModelSet::new(linear, kept.trained.model, seed)?;
        Ok(HybridReport {
            model_set,
            arimax_mape,
            hybrid_mape: kept.hybrid_mape,
            seed,
            history: kept.trained.history,
            trials: outcome.trials,
            stop_reason: outcome.stop_reason,
            retrain_kept,
            fell_back,
            test_forecast: kept.forecast,
        })
    }

    /// Retrain `seed` with the full budget, keeping `quick` when the
    /// retrain fails recoverably or regresses past `regression_tolerance`.
    fn retrain(&self, stage: &Stage<'_>, seed: u64, quick: Candidate) -> Result<(Candidate, bool)> {
        let hp = &self.config.hyperparameters;
        if hp.max_epochs <= hp.search_epochs {
            return Ok((quick, false));
        }

        let tolerance = self.config.policy.regression_tolerance;
        let (_, kept, retrain_kept) = guarded_retrain(quick.hybrid_mape, quick, tolerance, || {
            stage
                .evaluate_seed(seed, hp.max_epochs)
                .map(|full| (full.hybrid_mape, full))
        })?;
        Ok((kept, retrain_kept))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ResidualHyperparameters, SeedSearchPolicy};
    use crate::models::arimax::ArimaxOrder;
    use approx::assert_relative_eq;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn make_timestamps(n: usize) -> Vec<DateTime<Utc>> {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        (0..n).map(|i| base + Duration::hours(i as i64)).collect()
    }

    fn series(n: usize) -> TimeSeries {
        let wind: Vec<f64> = (0..n).map(|i| 8.0 + 3.0 * (i as f64 * 0.15).sin()).collect();
        let wave = wind
            .iter()
            .enumerate()
            .map(|(i, w)| 1.0 + 0.2 * w + 0.01 * (w - 8.0).powi(2) + 0.05 * (i as f64 * 0.7).cos())
            .collect();
        TimeSeries::new(make_timestamps(n), wave, wind).unwrap()
    }

    fn config(seeds: Vec<u64>) -> HybridConfig {
        HybridConfig::new(ArimaxOrder::new(1, 0, 0))
            .with_hyperparameters(
                ResidualHyperparameters::default()
                    .with_window(6)
                    .with_hidden_units(4)
                    .with_epochs(12, 4),
            )
            .with_policy(SeedSearchPolicy::default().with_seeds(seeds))
    }

    #[test]
    fn report_uses_one_test_segment() {
        let split = series(160).split_train_validation_test(0.7, 0.15).unwrap();
        let report = HybridOrchestrator::new(config(vec![42, 7]))
            .train_and_evaluate(&split.train, split.validation.as_ref(), &split.test)
            .unwrap();

        assert_eq!(report.test_forecast.horizon(), split.test.len());
        let recomputed = mape(split.test.wave_height(), &report.test_forecast.hybrid()).unwrap();
        assert_eq!(report.hybrid_mape, recomputed);
        let linear = mape(split.test.wave_height(), &report.test_forecast.linear()).unwrap();
        assert_eq!(report.arimax_mape, linear);
        assert!(!report.trials.is_empty());
        assert!(report.trials.len() <= 2);
        assert_eq!(report.model_set.metadata().seed, report.seed);
    }

    #[test]
    fn kept_model_is_never_worse_than_search_result() {
        let split = series(150).split_train_test(0.8).unwrap();
        let orchestrator = HybridOrchestrator::new(config(vec![3]));
        let report = orchestrator
            .train_and_evaluate(&split.train, None, &split.test)
            .unwrap();

        let quick = report.trials[0].score().unwrap();
        let tolerance = orchestrator.config().policy.regression_tolerance;
        assert!(report.hybrid_mape <= quick * (1.0 + tolerance) + 1e-12);
        if !report.retrain_kept {
            assert_eq!(report.hybrid_mape, quick);
        }
    }

    #[test]
    fn every_seed_failing_falls_back_to_zero_residuals() {
        let split = series(150).split_train_test(0.8).unwrap();
        let mut config = config(vec![1, 2, 3]);
        config.hyperparameters = config.hyperparameters.with_learning_rate(1e300);
        let report = HybridOrchestrator::new(config)
            .train_and_evaluate(&split.train, None, &split.test)
            .unwrap();

        assert!(report.fell_back);
        assert!(!report.retrain_kept);
        assert_eq!(report.seed, 1);
        assert_eq!(report.model_set.metadata().seed, 1);
        assert_eq!(report.stop_reason, StopReason::Exhausted);
        assert_eq!(report.trials.len(), 3);
        assert!(report.trials.iter().all(|t| t.score().is_none()));
        assert_eq!(report.history.epochs_trained, 0);

        assert!(report.test_forecast.residual().iter().all(|r| r.abs() < 1e-12));
        assert_relative_eq!(report.hybrid_mape, report.arimax_mape, max_relative = 1e-9);
        assert_eq!(report.model_set.forecast(5, None).unwrap().horizon(), 5);
    }

    #[test]
    fn retrain_is_skipped_without_extra_epochs() {
        let split = series(150).split_train_test(0.8).unwrap();
        let mut config = config(vec![4]);
        config.hyperparameters = config.hyperparameters.with_epochs(4, 4);
        let report = HybridOrchestrator::new(config)
            .train_and_evaluate(&split.train, None, &split.test)
            .unwrap();

        assert!(!report.fell_back);
        assert!(!report.retrain_kept);
        assert_eq!(Some(report.hybrid_mape), report.trials[0].score());
    }

    #[test]
    fn empty_inputs_are_data_not_found() {
        let full = series(60);
        let empty = full.slice(0..0).unwrap();
        let orchestrator = HybridOrchestrator::new(config(vec![1]));

        assert!(matches!(
            orchestrator.train_and_evaluate(&empty, None, &full),
            Err(ForecastError::DataNotFound(_))
        ));
        assert!(matches!(
            orchestrator.train_and_evaluate(&full, None, &empty),
            Err(ForecastError::DataNotFound(_))
        ));
    }

    #[test]
    fn cancellation_propagates() {
        let split = series(120).split_train_test(0.8).unwrap();
        let token = CancellationToken::new();
        token.cancel();
        let result = HybridOrchestrator::new(config(vec![1, 2]))
            .with_cancellation(token)
            .train_and_evaluate(&split.train, None, &split.test);

        assert!(matches!(result, Err(ForecastError::Cancelled(_))));
    }

    #[test]
    fn same_inputs_same_report() {
        let split = series(140).split_train_test(0.8).unwrap();
        let orchestrator = HybridOrchestrator::new(config(vec![5, 6]));
        let a = orchestrator.train_and_evaluate(&split.train, None, &split.test).unwrap();
        let b = orchestrator.train_and_evaluate(&split.train, None, &split.test).unwrap();

        assert_eq!(a.seed, b.seed);
        assert_eq!(a.hybrid_mape, b.hybrid_mape);
        assert_eq!(a.test_forecast, b.test_forecast);
    }
}
