//! ARIMAX model: wave height regressed on wind speed with ARIMA(p, d, q) errors.
//!
//! Both series are differenced `d` times. On the differenced scale
//!
//! ```text
//! Δy_t = c + β Δx_t + u_t
//! u_t  = Σ φ_i u_{t-i} + Σ θ_j e_{t-j} + e_t
//! ```
//!
//! and the coefficients minimize the conditional sum of squares of `e`.

use crate::core::TimeSeries;
use crate::error::{ForecastError, Result};
use crate::models::arimax::diff::{difference, difference_continuation, integrate};
use crate::utils::metrics::{calculate_metrics, AccuracyMetrics};
use crate::utils::ols::{invert_symmetric, least_squares};
use crate::utils::optimization::{minimize_with_restarts, SimplexOptions};
use crate::utils::stats::normal_two_sided_p_value;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, instrument, warn};

/// ARIMAX order (p, d, q).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArimaxOrder {
    /// AR order (p)
    pub p: usize,
    /// Differencing order (d)
    pub d: usize,
    /// MA order (q)
    pub q: usize,
}

impl ArimaxOrder {
    pub fn new(p: usize, d: usize, q: usize) -> Self {
        Self { p, d, q }
    }

    /// `p + d + q`.
    pub fn complexity(&self) -> usize {
        self.p + self.d + self.q
    }

    /// Intercept + wind coefficient + AR + MA.
    pub fn num_coefficients(&self) -> usize {
        self.p + self.q + 2
    }

    /// Shortest training series this order can be estimated on.
    pub fn min_observations(&self) -> usize {
        self.d + self.p.max(self.q) + self.num_coefficients() + 1
    }
}

impl Default for ArimaxOrder {
    fn default() -> Self {
        Self::new(1, 0, 0)
    }
}

impl fmt::Display for ArimaxOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ARIMAX({},{},{})", self.p, self.d, self.q)
    }
}

/// Estimated ARIMAX coefficients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArimaxCoefficients {
    /// Constant on the differenced scale (a drift when `d > 0`).
    pub intercept: f64,
    /// Wind-speed coefficient.
    pub exog: f64,
    pub ar: Vec<f64>,
    pub ma: Vec<f64>,
}

impl ArimaxCoefficients {
    fn from_vector(order: ArimaxOrder, v: &[f64]) -> Self {
        Self {
            intercept: v[0],
            exog: v[1],
            ar: v[2..2 + order.p].to_vec(),
            ma: v[2 + order.p..2 + order.p + order.q].to_vec(),
        }
    }

    fn to_vector(&self) -> Vec<f64> {
        let mut v = Vec::with_capacity(2 + self.ar.len() + self.ma.len());
        v.push(self.intercept);
        v.push(self.exog);
        v.extend_from_slice(&self.ar);
        v.extend_from_slice(&self.ma);
        v
    }

    fn names(order: ArimaxOrder) -> Vec<String> {
        let mut names = vec!["intercept".to_string(), "wind_speed".to_string()];
        names.extend((1..=order.p).map(|i| format!("ar.L{i}")));
        names.extend((1..=order.q).map(|j| format!("ma.L{j}")));
        names
    }
}

/// Inference summary for one coefficient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterEstimate {
    pub name: String,
    pub estimate: f64,
    /// `None` when the coefficient is not identified by the data.
    pub std_error: Option<f64>,
    pub z_value: Option<f64>,
    pub p_value: Option<f64>,
}

impl ParameterEstimate {
    /// `|z| > critical`; an unidentified coefficient is never significant.
    pub fn is_significant(&self, critical: f64) -> bool {
        self.z_value.is_some_and(|z| z.abs() > critical)
    }
}

/// Differenced-scale filter state.
struct Filtered {
    /// Regression errors `u_t`.
    errors: Vec<f64>,
    /// One-step innovations `e_t`, zero during warm-up.
    innovations: Vec<f64>,
    start: usize,
    css: f64,
}

fn arma_step(coef: &ArimaxCoefficients, errors: &[f64], innovations: &[f64], t: usize) -> f64 {
    let ar: f64 = coef
        .ar
        .iter()
        .enumerate()
        .map(|(i, phi)| phi * errors[t - 1 - i])
        .sum();
    let ma: f64 = coef
        .ma
        .iter()
        .enumerate()
        .map(|(j, theta)| theta * innovations[t - 1 - j])
        .sum();
    ar + ma
}

fn filter(order: ArimaxOrder, coef: &ArimaxCoefficients, dy: &[f64], dx: &[f64]) -> Filtered {
    let n = dy.len();
    let start = order.p.max(order.q);
    let errors: Vec<f64> = dy
        .iter()
        .zip(dx)
        .map(|(y, x)| y - coef.intercept - coef.exog * x)
        .collect();
    let mut innovations = vec![0.0; n];
    let mut css = 0.0;

    for t in start..n {
        let e = errors[t] - arma_step(coef, &errors, &innovations, t);
        innovations[t] = e;
        css += e * e;
    }

    Filtered {
        errors,
        innovations,
        start,
        css,
    }
}

/// A fitted ARIMAX model together with its training window.
///
/// Read-only once built; refitting with another order yields a new value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedArimax {
    order: ArimaxOrder,
    coefficients: ArimaxCoefficients,
    sigma2: f64,
    log_likelihood: f64,
    aic: f64,
    bic: f64,
    converged: bool,
    parameters: Vec<ParameterEstimate>,
    /// One per training observation, `None` during warm-up.
    fitted: Vec<Option<f64>>,
    train_wave: Vec<f64>,
    train_wind: Vec<f64>,
}

impl FittedArimax {
    /// Estimate an ARIMAX model of `order` on `series`.
    ///
    /// Fails with [`ForecastError::FitFailed`] when the wind column is
    /// missing or the optimizer ends on non-finite values, and with
    /// [`ForecastError::InsufficientData`] when the series is too short.
    /// Estimation is deterministic.
    #[instrument(skip_all, fields(order = %order, n = series.len()))]
    pub fn fit(series: &TimeSeries, order: ArimaxOrder) -> Result<Self> {
        let wind = series
            .wind_speed()
            .ok_or_else(|| ForecastError::fit(order.to_string(), "wind_speed column is missing"))?;
        let wave = series.wave_height();
        check_length(order, wave.len())?;

        let dy = difference(wave, order.d);
        let dx = difference(wind, order.d);
        let initial = initial_guess(order, &dy, &dx)?;

        let objective = |v: &[f64]| {
            filter(order, &ArimaxCoefficients::from_vector(order, v), &dy, &dx).css
        };
        let options = SimplexOptions {
            max_iterations: 5000,
            ..Default::default()
        };
        let result = minimize_with_restarts(objective, &initial, &options, 3);
        debug!(
            css = result.value,
            iterations = result.iterations,
            converged = result.converged,
            "ARIMAX optimizer finished"
        );

        if !result.value.is_finite() || result.point.iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::fit(
                order.to_string(),
                "optimizer ended on non-finite coefficients",
            ));
        }
        if !result.converged {
            warn!(%order, "ARIMAX optimizer hit its iteration limit");
        }

        let coefficients = ArimaxCoefficients::from_vector(order, &result.point);
        Self::assemble(order, coefficients, wave, wind, result.converged)
    }

    /// Rebuild a model from known coefficients on `series`.
    pub fn from_coefficients(
        series: &TimeSeries,
        order: ArimaxOrder,
        coefficients: ArimaxCoefficients,
    ) -> Result<Self> {
        if coefficients.ar.len() != order.p {
            return Err(ForecastError::shape("AR coefficients", order.p, coefficients.ar.len()));
        }
        if coefficients.ma.len() != order.q {
            return Err(ForecastError::shape("MA coefficients", order.q, coefficients.ma.len()));
        }
        let wind = series.require_wind_speed()?;
        check_length(order, series.len())?;
        Self::assemble(order, coefficients, series.wave_height(), wind, true)
    }

    fn assemble(
        order: ArimaxOrder,
        coefficients: ArimaxCoefficients,
        wave: &[f64],
        wind: &[f64],
        converged: bool,
    ) -> Result<Self> {
        let dy = difference(wave, order.d);
        let dx = difference(wind, order.d);
        let filtered = filter(order, &coefficients, &dy, &dx);
        if !filtered.css.is_finite() {
            return Err(ForecastError::fit(
                order.to_string(),
                "residual sum of squares is not finite",
            ));
        }

        let n_eff = (dy.len() - filtered.start) as f64;
        let sigma2 = (filtered.css / n_eff).max(f64::MIN_POSITIVE);
        let k = (order.num_coefficients() + 1) as f64;
        let log_likelihood =
            -0.5 * n_eff * (1.0 + sigma2.ln() + (2.0 * std::f64::consts::PI).ln());
        let aic = -2.0 * log_likelihood + 2.0 * k;
        let bic = -2.0 * log_likelihood + k * n_eff.ln();

        let estimates = coefficients.to_vector();
        let std_errors = standard_errors(order, &estimates, &dy, &dx, filtered.start, sigma2);
        let parameters = ArimaxCoefficients::names(order)
            .into_iter()
            .zip(estimates.iter().zip(std_errors))
            .map(|(name, (&estimate, std_error))| {
                let z_value = std_error.map(|se| estimate / se);
                ParameterEstimate {
                    name,
                    estimate,
                    std_error,
                    z_value,
                    p_value: z_value.map(normal_two_sided_p_value),
                }
            })
            .collect();

        let warm_up = order.d + filtered.start;
        let fitted = wave
            .iter()
            .enumerate()
            .map(|(t, &y)| (t >= warm_up).then(|| y - filtered.innovations[t - order.d]))
            .collect();

        Ok(Self {
            order,
            coefficients,
            sigma2,
            log_likelihood,
            aic,
            bic,
            converged,
            parameters,
            fitted,
            train_wave: wave.to_vec(),
            train_wind: wind.to_vec(),
        })
    }

    pub fn order(&self) -> ArimaxOrder {
        self.order
    }

    pub fn coefficients(&self) -> &ArimaxCoefficients {
        &self.coefficients
    }

    pub fn ar_coefficients(&self) -> &[f64] {
        &self.coefficients.ar
    }

    pub fn ma_coefficients(&self) -> &[f64] {
        &self.coefficients.ma
    }

    pub fn exog_coefficient(&self) -> f64 {
        self.coefficients.exog
    }

    pub fn intercept(&self) -> f64 {
        self.coefficients.intercept
    }

    /// Innovation variance.
    pub fn sigma2(&self) -> f64 {
        self.sigma2
    }

    pub fn log_likelihood(&self) -> f64 {
        self.log_likelihood
    }

    pub fn aic(&self) -> f64 {
        self.aic
    }

    pub fn bic(&self) -> f64 {
        self.bic
    }

    /// Whether the optimizer met its tolerance before the iteration limit.
    pub fn converged(&self) -> bool {
        self.converged
    }

    /// Coefficient table: intercept, wind speed, AR lags, MA lags.
    pub fn parameters(&self) -> &[ParameterEstimate] {
        &self.parameters
    }

    /// In-sample one-step predictions aligned with the training series.
    pub fn fitted_values(&self) -> &[Option<f64>] {
        &self.fitted
    }

    /// Index of the first training observation with a defined fit.
    pub fn warm_up(&self) -> usize {
        self.fitted.iter().take_while(|f| f.is_none()).count()
    }

    /// `actual - fitted` over the observations with a defined fit.
    pub fn residuals(&self) -> Vec<f64> {
        self.train_wave
            .iter()
            .zip(&self.fitted)
            .filter_map(|(y, f)| f.map(|f| y - f))
            .collect()
    }

    /// Accuracy of the in-sample fit.
    pub fn in_sample_metrics(&self) -> Result<AccuracyMetrics> {
        let (actual, fitted): (Vec<f64>, Vec<f64>) = self
            .train_wave
            .iter()
            .zip(&self.fitted)
            .filter_map(|(&y, f)| f.map(|f| (y, f)))
            .unzip();
        calculate_metrics(&actual, &fitted)
    }

    /// Number of training observations.
    pub fn n_obs(&self) -> usize {
        self.train_wave.len()
    }

    /// Last wind speed seen in training.
    pub fn last_wind_speed(&self) -> Option<f64> {
        self.train_wind.last().copied()
    }

    /// Point forecast for `horizon` steps past the training window.
    ///
    /// `future_exog` must hold exactly `horizon` wind speeds.
    pub fn forecast(&self, horizon: usize, future_exog: &[f64]) -> Result<Vec<f64>> {
        if future_exog.len() != horizon {
            return Err(ForecastError::shape(
                format!("future wind speed for {}", self.order),
                horizon,
                future_exog.len(),
            ));
        }
        if horizon == 0 {
            return Ok(Vec::new());
        }
        if let Some(i) = future_exog.iter().position(|v| !v.is_finite()) {
            return Err(ForecastError::InvalidParameter(format!(
                "future wind speed must be finite (index {i})"
            )));
        }

        let d = self.order.d;
        let coef = &self.coefficients;
        let dy = difference(&self.train_wave, d);
        let dx = difference(&self.train_wind, d);
        let Filtered {
            mut errors,
            mut innovations,
            ..
        } = filter(self.order, coef, &dy, &dx);
        let dx_future = difference_continuation(&self.train_wind, future_exog, d);

        let mut diffed = Vec::with_capacity(horizon);
        for dx_h in dx_future {
            let t = errors.len();
            let u = arma_step(coef, &errors, &innovations, t);
            errors.push(u);
            innovations.push(0.0);
            diffed.push(coef.intercept + coef.exog * dx_h + u);
        }

        Ok(integrate(&diffed, &self.train_wave, d))
    }

    /// Forecast across consecutive held-out segments, driven by their
    /// observed wind speed. Returns one prediction vector per segment.
    pub fn forecast_segments(&self, segments: &[&TimeSeries]) -> Result<Vec<Vec<f64>>> {
        let mut wind = Vec::new();
        for segment in segments {
            wind.extend_from_slice(segment.require_wind_speed()?);
        }
        let mut forecast = self.forecast(wind.len(), &wind)?.into_iter();
        Ok(segments
            .iter()
            .map(|segment| forecast.by_ref().take(segment.len()).collect())
            .collect())
    }
}

fn check_length(order: ArimaxOrder, len: usize) -> Result<()> {
    let needed = order.min_observations();
    if len < needed {
        return Err(ForecastError::InsufficientData { needed, got: len });
    }
    Ok(())
}

/// OLS for intercept and wind coefficient, small decaying AR/MA starts.
fn initial_guess(order: ArimaxOrder, dy: &[f64], dx: &[f64]) -> Result<Vec<f64>> {
    let beta = least_squares(dy, &[vec![1.0; dy.len()], dx.to_vec()])?;
    let mut initial = beta;
    initial.extend((0..order.p).map(|i| 0.1 / (i + 1) as f64));
    initial.extend((0..order.q).map(|j| 0.1 / (j + 1) as f64));
    Ok(initial)
}

/// Gauss-Newton standard errors `sqrt(σ² diag((JᵀJ)⁻¹))` from a central
/// difference Jacobian of the innovations.
///
/// Coefficients with an all-zero Jacobian column (e.g. a constant wind
/// series after differencing) get `None`; the rest are inverted jointly.
fn standard_errors(
    order: ArimaxOrder,
    estimates: &[f64],
    dy: &[f64],
    dx: &[f64],
    start: usize,
    sigma2: f64,
) -> Vec<Option<f64>> {
    let k = estimates.len();
    let innovations_at = |v: &[f64]| {
        filter(order, &ArimaxCoefficients::from_vector(order, v), dy, dx).innovations
    };

    let columns: Vec<Vec<f64>> = (0..k)
        .map(|i| {
            let h = 1e-6 * estimates[i].abs().max(1.0);
            let mut plus = estimates.to_vec();
            let mut minus = estimates.to_vec();
            plus[i] += h;
            minus[i] -= h;
            let (ep, em) = (innovations_at(&plus), innovations_at(&minus));
            ep[start..]
                .iter()
                .zip(&em[start..])
                .map(|(a, b)| (a - b) / (2.0 * h))
                .collect()
        })
        .collect();

    let identified: Vec<usize> = (0..k)
        .filter(|&i| {
            let norm2: f64 = columns[i].iter().map(|v| v * v).sum();
            norm2.is_finite() && norm2 > 1e-12
        })
        .collect();

    let gram: Vec<Vec<f64>> = identified
        .iter()
        .map(|&i| {
            identified
                .iter()
                .map(|&j| columns[i].iter().zip(&columns[j]).map(|(a, b)| a * b).sum())
                .collect()
        })
        .collect();

    let mut result = vec![None; k];
    if let Some(inverse) = invert_symmetric(&gram) {
        for (row, &i) in identified.iter().enumerate() {
            let var = sigma2 * inverse[row][row];
            if var.is_finite() && var > 0.0 {
                result[i] = Some(var.sqrt());
            }
        }
    }
    result
}
