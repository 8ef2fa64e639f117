//! Immutable snapshot of a trained hybrid model.
//!
//! A [`ModelSet`] owns the linear model, the residual network with its
//! scaler, and the residual window that seeds future forecasts. It has no
//! mutating methods; retraining produces a new value that a serving layer
//! can swap in (for example behind an `Arc`).

use crate::config::{ConfigOverrides, ResidualHyperparameters};
use crate::core::{ForecastResult, TimeSeries};
use crate::error::{ForecastError, Result};
use crate::models::arimax::{ArimaxOrder, FittedArimax};
use crate::models::lstm::{ResidualModel, ResidualTrainer, TrainingHistory};
use crate::utils::metrics::{calculate_metrics, AccuracyMetrics};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// Provenance stored alongside a model set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub order: ArimaxOrder,
    pub window: usize,
    pub hidden_units: usize,
    /// Seed of the residual network that was kept.
    pub seed: u64,
    pub trained_at: DateTime<Utc>,
}

impl ModelMetadata {
    /// Saved settings, for [`crate::config::HybridConfig::resolve`].
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            order: Some(self.order),
            window: Some(self.window),
            hidden_units: Some(self.hidden_units),
            ..Default::default()
        }
    }
}

/// Hold-out accuracy of the linear and hybrid forecasts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoldoutEvaluation {
    pub arimax: AccuracyMetrics,
    pub hybrid: AccuracyMetrics,
    pub forecast: ForecastResult,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSet {
    linear: FittedArimax,
    residual: ResidualModel,
    /// Scaled last `window` training residuals.
    seed_window: Vec<f64>,
    metadata: ModelMetadata,
}

impl ModelSet {
    /// Fit the linear stage.
    pub fn fit_linear(series: &TimeSeries, order: ArimaxOrder) -> Result<FittedArimax> {
        FittedArimax::fit(series, order)
    }

    /// Train the residual stage on `linear`'s in-sample residuals and
    /// assemble a model set.
    ///
    /// `validation`, when given, must immediately follow the training
    /// window; its ARIMAX residuals drive early stopping.
    #[instrument(skip_all, fields(order = %linear.order(), seed = seed))]
    pub fn fit_residual(
        linear: FittedArimax,
        hyperparameters: &ResidualHyperparameters,
        seed: u64,
        validation: Option<&TimeSeries>,
    ) -> Result<(Self, TrainingHistory)> {
        let residuals = linear.residuals();
        let validation_residuals = match validation {
            Some(series) => Some(holdout_residuals(&linear, series)?),
            None => None,
        };

        let trained = ResidualTrainer::new(hyperparameters.clone(), seed)
            .train(&residuals, validation_residuals.as_deref())?;
        let model_set = Self::new(linear, trained.model, seed)?;
        Ok((model_set, trained.history))
    }

    /// Pair a linear model with a residual model trained on its residuals.
    pub fn new(linear: FittedArimax, residual: ResidualModel, seed: u64) -> Result<Self> {
        let seed_window = residual.seed_window(&linear.residuals())?;
        let metadata = ModelMetadata {
            order: linear.order(),
            window: residual.window(),
            hidden_units: residual.network().hidden_units(),
            seed,
            trained_at: Utc::now(),
        };
        Ok(Self {
            linear,
            residual,
            seed_window,
            metadata,
        })
    }

    pub fn linear(&self) -> &FittedArimax {
        &self.linear
    }

    pub fn residual(&self) -> &ResidualModel {
        &self.residual
    }

    pub fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    /// Hybrid forecast for `n_steps` past the training window.
    ///
    /// Without `exogenous_future` the last training wind speed is held
    /// constant; otherwise it must hold exactly `n_steps` values.
    pub fn forecast(
        &self,
        n_steps: usize,
        exogenous_future: Option<&[f64]>,
    ) -> Result<ForecastResult> {
        let held;
        let wind: &[f64] = match exogenous_future {
            Some(wind) => wind,
            None => {
                let last = self.linear.last_wind_speed().ok_or_else(|| {
                    ForecastError::DataNotFound("training wind speed".to_string())
                })?;
                held = vec![last; n_steps];
                &held
            }
        };

        let linear = self.linear.forecast(n_steps, wind)?;
        let residual = self.residual.predict_iterative(&self.seed_window, n_steps)?;
        ForecastResult::combine(&linear, &residual)
    }

    /// Score the linear and hybrid forecasts on `test`, which must start
    /// right after the training window.
    pub fn evaluate(&self, test: &TimeSeries) -> Result<HoldoutEvaluation> {
        if test.is_empty() {
            return Err(ForecastError::DataNotFound("test series".to_string()));
        }
        let forecast = self.forecast(test.len(), Some(test.require_wind_speed()?))?;
        let arimax = calculate_metrics(test.wave_height(), &forecast.linear())?;
        let hybrid = calculate_metrics(test.wave_height(), &forecast.hybrid())?;
        debug!(arimax_mape = arimax.mape, hybrid_mape = hybrid.mape, "evaluated model set");
        Ok(HoldoutEvaluation {
            arimax,
            hybrid,
            forecast,
        })
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode a model set and check its parts agree.
    pub fn from_json(json: &str) -> Result<Self> {
        let model_set: Self = serde_json::from_str(json)?;
        if model_set.seed_window.len() != model_set.residual.window() {
            return Err(ForecastError::shape(
                "persisted seed window",
                model_set.residual.window(),
                model_set.seed_window.len(),
            ));
        }
        if model_set.metadata.order != model_set.linear.order() {
            return Err(ForecastError::Serialization(format!(
                "metadata order {} does not match linear model {}",
                model_set.metadata.order,
                model_set.linear.order()
            )));
        }
        Ok(model_set)
    }
}

/// `actual - forecast` over a segment that follows the training window.
pub(crate) fn holdout_residuals(linear: &FittedArimax, series: &TimeSeries) -> Result<Vec<f64>> {
    let forecast = linear.forecast(series.len(), series.require_wind_speed()?)?;
    Ok(forecast_residuals(series.wave_height(), &forecast))
}

/// `actual - forecast`, pairwise.
pub(crate) fn forecast_residuals(actual: &[f64], forecast: &[f64]) -> Vec<f64> {
    actual.iter().zip(forecast).map(|(y, f)| y - f).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{Duration, TimeZone};

    fn make_timestamps(n: usize) -> Vec<DateTime<Utc>> {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        (0..n).map(|i| base + Duration::hours(i as i64)).collect()
    }

    fn series(n: usize) -> TimeSeries {
        let wind: Vec<f64> = (0..n).map(|i| 7.0 + 2.0 * (i as f64 * 0.2).sin()).collect();
        let wave = wind
            .iter()
            .enumerate()
            .map(|(i, w)| 1.5 + 0.25 * w + 0.15 * (i as f64 * 0.9).sin())
            .collect();
        TimeSeries::new(make_timestamps(n), wave, wind).unwrap()
    }

    fn hyperparameters() -> ResidualHyperparameters {
        ResidualHyperparameters::default()
            .with_window(6)
            .with_hidden_units(4)
            .with_epochs(15, 5)
    }

    fn fitted(n: usize) -> ModelSet {
        let linear = ModelSet::fit_linear(&series(n), ArimaxOrder::new(1, 0, 0)).unwrap();
        ModelSet::fit_residual(linear, &hyperparameters(), 42, None)
            .unwrap()
            .0
    }

    #[test]
    fn forecast_combines_both_stages() {
        let model_set = fitted(120);
        let forecast = model_set.forecast(5, Some(&[7.0; 5])).unwrap();

        assert_eq!(forecast.horizon(), 5);
        for step in forecast.steps() {
            assert_relative_eq!(step.hybrid, step.linear + step.residual, epsilon = 1e-12);
        }
    }

    #[test]
    fn missing_exogenous_holds_last_wind_speed() {
        let model_set = fitted(120);
        let last = model_set.linear().last_wind_speed().unwrap();

        let implicit = model_set.forecast(4, None).unwrap();
        let explicit = model_set.forecast(4, Some(&[last; 4])).unwrap();
        assert_eq!(implicit, explicit);
    }

    #[test]
    fn exogenous_length_must_match() {
        let model_set = fitted(120);
        assert!(matches!(
            model_set.forecast(4, Some(&[7.0; 3])),
            Err(ForecastError::ShapeMismatch { .. })
        ));
        assert!(model_set.forecast(0, Some(&[])).unwrap().is_empty());
    }

    #[test]
    fn json_round_trip_preserves_forecasts() {
        let model_set = fitted(120);
        let restored = ModelSet::from_json(&model_set.to_json().unwrap()).unwrap();

        assert_eq!(restored, model_set);
        assert_eq!(
            restored.forecast(8, None).unwrap(),
            model_set.forecast(8, None).unwrap()
        );
    }

    #[test]
    fn corrupted_json_is_rejected() {
        assert!(matches!(
            ModelSet::from_json("{\"linear\": 3}"),
            Err(ForecastError::Serialization(_))
        ));
    }

    #[test]
    fn evaluate_reports_both_metrics() {
        let full = series(140);
        let train = full.slice(0..120).unwrap();
        let test = full.slice(120..140).unwrap();
        let linear = ModelSet::fit_linear(&train, ArimaxOrder::new(1, 0, 0)).unwrap();
        let (model_set, _) = ModelSet::fit_residual(linear, &hyperparameters(), 7, None).unwrap();

        let evaluation = model_set.evaluate(&test).unwrap();
        assert!(evaluation.arimax.mape.is_finite());
        assert!(evaluation.hybrid.mape.is_finite());
        assert_eq!(evaluation.forecast.horizon(), 20);
    }

    #[test]
    fn metadata_feeds_config_resolution() {
        let model_set = fitted(120);
        let overrides = model_set.metadata().overrides();
        assert_eq!(overrides.order, Some(ArimaxOrder::new(1, 0, 0)));
        assert_eq!(overrides.window, Some(6));
        assert_eq!(model_set.metadata().seed, 42);
    }

    #[test]
    fn holdout_residuals_subtract_the_linear_forecast() {
        assert_eq!(forecast_residuals(&[2.0, 3.5, 1.0], &[1.5, 3.5, 2.0]), vec![0.5, 0.0, -1.0]);

        let full = series(130);
        let linear = ModelSet::fit_linear(&full.slice(0..110).unwrap(), ArimaxOrder::new(1, 0, 0)).unwrap();
        let holdout = full.slice(110..130).unwrap();
        let forecast = linear.forecast(20, holdout.wind_speed().unwrap()).unwrap();
        assert_eq!(
            holdout_residuals(&linear, &holdout).unwrap(),
            forecast_residuals(holdout.wave_height(), &forecast)
        );
    }
}
