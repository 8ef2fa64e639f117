//! ARIMAX order selection by a composite hold-out score.

use crate::core::TimeSeries;
use crate::error::{ForecastError, Result};
use crate::models::arimax::diagnostics::diagnose;
use crate::models::arimax::model::{ArimaxOrder, FittedArimax};
use crate::utils::metrics::mape;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

/// Weight on the validation/test gap once it exceeds half the test MAPE.
const GAP_WEIGHT: f64 = 0.5;
/// Penalty per unit of `p + d + q`.
const COMPLEXITY_WEIGHT: f64 = 0.1;

/// Diagnostics and hold-out accuracy of one candidate order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelEvaluation {
    pub order: ArimaxOrder,
    pub stable: bool,
    pub invertible: bool,
    pub significant: bool,
    pub aic: Option<f64>,
    pub bic: Option<f64>,
    /// In-sample MAPE over the post-warm-up training observations.
    pub train_mape: Option<f64>,
    pub validation_mape: Option<f64>,
    pub test_mape: Option<f64>,
    pub accepted: bool,
    pub reasons: Vec<String>,
}

impl ModelEvaluation {
    /// Evaluation for an order that could not be fitted or forecast.
    pub fn rejected(order: ArimaxOrder, reason: impl Into<String>) -> Self {
        Self {
            order,
            stable: false,
            invertible: false,
            significant: false,
            aic: None,
            bic: None,
            train_mape: None,
            validation_mape: None,
            test_mape: None,
            accepted: false,
            reasons: vec![reason.into()],
        }
    }

    /// Rejection reasons joined with `"; "`.
    pub fn reason(&self) -> Option<String> {
        (!self.reasons.is_empty()).then(|| self.reasons.join("; "))
    }
}

/// Ranks candidate ARIMAX orders.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSelector {
    orders: Vec<ArimaxOrder>,
}

impl Default for ModelSelector {
    fn default() -> Self {
        Self::new(Self::default_orders())
    }
}

impl ModelSelector {
    pub fn new(orders: Vec<ArimaxOrder>) -> Self {
        Self { orders }
    }

    /// The candidate orders tried when none are given.
    pub fn default_orders() -> Vec<ArimaxOrder> {
        [
            (1, 0, 0),
            (1, 1, 0),
            (0, 0, 1),
            (2, 1, 0),
            (1, 1, 1),
            (0, 1, 1),
            (2, 1, 1),
        ]
        .into_iter()
        .map(|(p, d, q)| ArimaxOrder::new(p, d, q))
        .collect()
    }

    pub fn orders(&self) -> &[ArimaxOrder] {
        &self.orders
    }

    /// Fit, diagnose and score every candidate order.
    ///
    /// A candidate that fails to fit or forecast becomes a rejected
    /// evaluation carrying the error; missing hold-out data is an error.
    #[instrument(skip_all, fields(candidates = self.orders.len(), n_train = train.len()))]
    pub fn evaluate_orders(
        &self,
        train: &TimeSeries,
        validation: Option<&TimeSeries>,
        test: &TimeSeries,
    ) -> Result<Vec<ModelEvaluation>> {
        if train.is_empty() {
            return Err(ForecastError::DataNotFound("training series".to_string()));
        }
        if test.is_empty() {
            return Err(ForecastError::DataNotFound("test series".to_string()));
        }
        test.require_wind_speed()?;
        if let Some(validation) = validation {
            validation.require_wind_speed()?;
        }

        Ok(self
            .orders
            .iter()
            .map(|&order| {
                evaluate_order(train, validation, test, order).unwrap_or_else(|err| {
                    warn!(%order, error = %err, "candidate order rejected");
                    ModelEvaluation::rejected(order, err.to_string())
                })
            })
            .collect())
    }

    /// Composite score, lower is better; `None` for rejected candidates or
    /// those without a test MAPE.
    ///
    /// `test + (gap > 0.5 test ? 0.5 gap : 0) + 0.1 (p + d + q)` where
    /// `gap = |validation - test|`. Without a validation MAPE there is no
    /// gap penalty.
    pub fn score(evaluation: &ModelEvaluation) -> Option<f64> {
        if !evaluation.accepted {
            return None;
        }
        let test = evaluation.test_mape.filter(|m| m.is_finite())?;
        let gap_penalty = match evaluation.validation_mape {
            Some(validation) => {
                let gap = (validation - test).abs();
                if gap > 0.5 * test {
                    GAP_WEIGHT * gap
                } else {
                    0.0
                }
            }
            None => 0.0,
        };
        Some(test + gap_penalty + COMPLEXITY_WEIGHT * evaluation.order.complexity() as f64)
    }

    /// Accepted evaluation with the lowest score. Ties keep the earlier one.
    pub fn select_best(evaluations: &[ModelEvaluation]) -> Option<&ModelEvaluation> {
        let mut best: Option<(&ModelEvaluation, f64)> = None;
        for evaluation in evaluations {
            let Some(score) = Self::score(evaluation) else {
                continue;
            };
            debug!(order = %evaluation.order, score, "scored candidate");
            if best.map_or(true, |(_, b)| score < b) {
                best = Some((evaluation, score));
            }
        }
        if let Some((evaluation, score)) = best {
            info!(order = %evaluation.order, score, "selected order");
        }
        best.map(|(evaluation, _)| evaluation)
    }
}

/// Fit `order` on `train` and measure it on the hold-out segments.
///
/// The forecast runs straight through validation into test so the test
/// MAPE is the same whether or not a validation segment exists.
pub fn evaluate_order(
    train: &TimeSeries,
    validation: Option<&TimeSeries>,
    test: &TimeSeries,
    order: ArimaxOrder,
) -> Result<ModelEvaluation> {
    let model = FittedArimax::fit(train, order)?;
    let diagnostics = diagnose(&model);

    let segments: Vec<&TimeSeries> = validation.into_iter().chain(Some(test)).collect();
    let forecasts = model.forecast_segments(&segments)?;
    let validation_mape = match validation {
        Some(validation) => Some(mape(validation.wave_height(), &forecasts[0])?),
        None => None,
    };
    let test_forecast = forecasts.last().map(Vec::as_slice).unwrap_or_default();
    let test_mape = mape(test.wave_height(), test_forecast)?;
    let train_mape = model.in_sample_metrics().ok().map(|m| m.mape);

    debug!(
        %order,
        accepted = diagnostics.accepted(),
        test_mape,
        "evaluated order"
    );

    Ok(ModelEvaluation {
        order,
        stable: diagnostics.stable,
        invertible: diagnostics.invertible,
        significant: diagnostics.significant,
        aic: Some(diagnostics.aic),
        bic: Some(diagnostics.bic),
        train_mape,
        validation_mape,
        test_mape: Some(test_mape),
        accepted: diagnostics.accepted(),
        reasons: diagnostics.failures,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn make_timestamps(n: usize) -> Vec<DateTime<Utc>> {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        (0..n).map(|i| base + Duration::hours(i as i64)).collect()
    }

    fn noise(i: usize) -> f64 {
        let x = (i as f64 * 12.9898 + 78.233).sin() * 43758.5453;
        x - x.floor() - 0.5
    }

    fn accepted(order: ArimaxOrder, test_mape: f64, validation_mape: Option<f64>) -> ModelEvaluation {
        ModelEvaluation {
            order,
            stable: true,
            invertible: true,
            significant: true,
            aic: Some(0.0),
            bic: Some(0.0),
            train_mape: None,
            validation_mape,
            test_mape: Some(test_mape),
            accepted: true,
            reasons: Vec::new(),
        }
    }

    #[test]
    fn score_arithmetic_prefers_lower_test_mape() {
        let simple = accepted(ArimaxOrder::new(1, 0, 0), 10.0, None);
        let complex = accepted(ArimaxOrder::new(2, 1, 1), 9.5, None);

        assert_relative_eq!(ModelSelector::score(&simple).unwrap(), 10.1, epsilon = 1e-12);
        assert_relative_eq!(ModelSelector::score(&complex).unwrap(), 9.9, epsilon = 1e-12);

        let evaluations = [simple, complex];
        let best = ModelSelector::select_best(&evaluations).unwrap();
        assert_eq!(best.order, ArimaxOrder::new(2, 1, 1));
    }

    #[test]
    fn complexity_breaks_near_ties() {
        let evaluations = [
            accepted(ArimaxOrder::new(2, 1, 1), 9.8, None),
            accepted(ArimaxOrder::new(1, 0, 0), 10.0, None),
        ];
        let best = ModelSelector::select_best(&evaluations).unwrap();
        assert_eq!(best.order, ArimaxOrder::new(1, 0, 0));
    }

    #[test]
    fn large_validation_gap_is_penalized() {
        let small_gap = accepted(ArimaxOrder::new(1, 0, 0), 10.0, Some(12.0));
        let large_gap = accepted(ArimaxOrder::new(1, 0, 0), 10.0, Some(20.0));

        assert_relative_eq!(ModelSelector::score(&small_gap).unwrap(), 10.1, epsilon = 1e-12);
        assert_relative_eq!(ModelSelector::score(&large_gap).unwrap(), 15.1, epsilon = 1e-12);
    }

    #[test]
    fn rejected_candidates_are_never_selected() {
        let mut unstable = accepted(ArimaxOrder::new(1, 0, 0), 1.0, None);
        unstable.accepted = false;
        unstable.stable = false;

        assert!(ModelSelector::score(&unstable).is_none());
        assert!(ModelSelector::select_best(&[unstable]).is_none());
        assert!(ModelSelector::select_best(&[]).is_none());
    }

    #[test]
    fn default_orders_are_the_seven_candidates() {
        let orders = ModelSelector::default_orders();
        assert_eq!(orders.len(), 7);
        assert_eq!(orders[0], ArimaxOrder::new(1, 0, 0));
        assert_eq!(orders[6], ArimaxOrder::new(2, 1, 1));
    }

    #[test]
    fn evaluate_orders_covers_every_candidate() {
        let n = 200;
        let wind: Vec<f64> = (0..n).map(|i| 6.0 + 2.0 * (i as f64 * 0.3).sin()).collect();
        let mut u = 0.0;
        let wave: Vec<f64> = (0..n)
            .map(|i| {
                u = 0.6 * u + 0.1 * noise(i);
                2.0 + 0.3 * wind[i] + u
            })
            .collect();
        let series = TimeSeries::new(make_timestamps(n), wave, wind).unwrap();
        let split = series.split_train_validation_test(0.7, 0.15).unwrap();

        let evaluations = ModelSelector::default()
            .evaluate_orders(&split.train, split.validation.as_ref(), &split.test)
            .unwrap();

        assert_eq!(evaluations.len(), 7);
        for evaluation in &evaluations {
            assert!(evaluation.test_mape.is_some());
            assert!(evaluation.validation_mape.is_some());
            assert_eq!(evaluation.accepted, evaluation.reasons.is_empty());
        }
        let best = ModelSelector::select_best(&evaluations).unwrap();
        assert!(best.accepted);
        assert!(best.test_mape.unwrap() < 10.0);
    }

    #[test]
    fn unfittable_order_becomes_rejection() {
        let n = 12;
        let series = TimeSeries::new(
            make_timestamps(n),
            (0..n).map(|i| 2.0 + noise(i)).collect(),
            (0..n).map(|i| 5.0 + noise(i + 7)).collect(),
        )
        .unwrap();
        let train = series.slice(0..8).unwrap();
        let test = series.slice(8..12).unwrap();

        let evaluations = ModelSelector::new(vec![ArimaxOrder::new(2, 1, 1)])
            .evaluate_orders(&train, None, &test)
            .unwrap();

        assert!(!evaluations[0].accepted);
        assert!(evaluations[0].reason().unwrap().contains("insufficient data"));
    }

    #[test]
    fn empty_test_is_data_not_found() {
        let series = TimeSeries::new(make_timestamps(3), vec![1.0; 3], vec![1.0; 3]).unwrap();
        let empty = series.slice(0..0).unwrap();
        assert!(matches!(
            ModelSelector::default().evaluate_orders(&series, None, &empty),
            Err(ForecastError::DataNotFound(_))
        ));
    }
}
