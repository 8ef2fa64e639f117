//! Augmented Dickey-Fuller stationarity test.
//!
//! Used to decide how many differences a wave-height series needs before
//! an ARIMAX order is chosen.

use crate::models::arimax::diff::difference;
use crate::utils::ols::{invert_symmetric, least_squares};
use serde::{Deserialize, Serialize};

/// Result of a stationarity test.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StationarityResult {
    /// Test statistic
    pub statistic: f64,
    /// P-value (interpolated)
    pub p_value: f64,
    /// Number of lagged differences in the regression
    pub lags: usize,
    /// Whether the unit root is rejected at 5%
    pub is_stationary: bool,
    pub critical_values: CriticalValues,
}

/// Critical values for the ADF test with a constant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CriticalValues {
    pub cv_1pct: f64,
    pub cv_5pct: f64,
    pub cv_10pct: f64,
}

impl Default for CriticalValues {
    fn default() -> Self {
        Self {
            cv_1pct: -3.43,
            cv_5pct: -2.86,
            cv_10pct: -2.57,
        }
    }
}

/// Asymptotic Dickey-Fuller τ quantiles (constant, no trend).
const TAU_QUANTILES: [(f64, f64); 10] = [
    (-3.96, 0.001),
    (-3.43, 0.01),
    (-3.12, 0.025),
    (-2.86, 0.05),
    (-2.57, 0.10),
    (-1.57, 0.50),
    (-0.44, 0.90),
    (-0.07, 0.95),
    (0.23, 0.975),
    (0.60, 0.99),
];

fn unavailable(lags: usize) -> StationarityResult {
    StationarityResult {
        statistic: f64::NAN,
        p_value: f64::NAN,
        lags,
        is_stationary: false,
        critical_values: CriticalValues::default(),
    }
}

/// Augmented Dickey-Fuller test for a unit root.
///
/// Regresses `Δy_t = α + β y_{t-1} + Σ γ_i Δy_{t-i}` and reports the
/// t-statistic of `β`. The lag count is chosen by AIC up to `max_lags`
/// (default `(n-1)^(1/3)`) on a common sample. Series shorter than ten
/// points return NaN.
pub fn adf_test(series: &[f64], max_lags: Option<usize>) -> StationarityResult {
    let n = series.len();
    if n < 10 {
        return unavailable(0);
    }

    let max_lags = max_lags
        .unwrap_or_else(|| ((n - 1) as f64).powf(1.0 / 3.0).floor() as usize)
        .min(n / 4);
    let diff = difference(series, 1);

    let mut best: Option<(usize, f64)> = None;
    for lag in 0..=max_lags {
        if let Some(fit) = adf_regression(series, &diff, lag, max_lags) {
            if best.map_or(true, |(_, aic)| fit.aic < aic) {
                best = Some((lag, fit.aic));
            }
        }
    }
    let Some((lag, _)) = best else {
        return unavailable(0);
    };
    let Some(fit) = adf_regression(series, &diff, lag, lag) else {
        return unavailable(lag);
    };

    let critical_values = CriticalValues::default();
    StationarityResult {
        statistic: fit.t_stat,
        p_value: tau_p_value(fit.t_stat),
        lags: lag,
        is_stationary: fit.t_stat < critical_values.cv_5pct,
        critical_values,
    }
}

/// Smallest `d <= max_d` whose differenced series passes [`adf_test`].
///
/// Returns `max_d` when none does.
pub fn suggest_differencing(series: &[f64], max_d: usize) -> usize {
    (0..=max_d)
        .find(|&d| adf_test(&difference(series, d), None).is_stationary)
        .unwrap_or(max_d)
}

struct AdfFit {
    t_stat: f64,
    aic: f64,
}

/// OLS of `diff[k]` on `[1, y[k], diff[k-1..=k-lag]]` for `k >= start`.
fn adf_regression(level: &[f64], diff: &[f64], lag: usize, start: usize) -> Option<AdfFit> {
    let rows: Vec<usize> = (start.max(lag)..diff.len()).collect();
    let m = rows.len();
    let k = lag + 2;
    if m <= k + 1 {
        return None;
    }

    let y: Vec<f64> = rows.iter().map(|&r| diff[r]).collect();
    let mut columns = vec![vec![1.0; m], rows.iter().map(|&r| level[r]).collect()];
    for i in 1..=lag {
        columns.push(rows.iter().map(|&r| diff[r - i]).collect());
    }

    let beta = least_squares(&y, &columns).ok()?;
    let rss: f64 = (0..m)
        .map(|obs| {
            let fitted: f64 = columns.iter().zip(&beta).map(|(c, b)| c[obs] * b).sum();
            (y[obs] - fitted).powi(2)
        })
        .sum();
    if rss <= 0.0 || !rss.is_finite() {
        return None;
    }

    let gram: Vec<Vec<f64>> = columns
        .iter()
        .map(|a| {
            columns
                .iter()
                .map(|b| a.iter().zip(b).map(|(x, z)| x * z).sum())
                .collect()
        })
        .collect();
    let inverse = invert_symmetric(&gram)?;
    let sigma2 = rss / (m - k) as f64;
    let se = (sigma2 * inverse[1][1]).sqrt();
    if !se.is_finite() || se == 0.0 {
        return None;
    }

    Some(AdfFit {
        t_stat: beta[1] / se,
        aic: m as f64 * (rss / m as f64).ln() + 2.0 * k as f64,
    })
}

/// Linear interpolation in the τ quantile table.
fn tau_p_value(t_stat: f64) -> f64 {
    if t_stat.is_nan() {
        return f64::NAN;
    }
    let (first, last) = (TAU_QUANTILES[0], TAU_QUANTILES[TAU_QUANTILES.len() - 1]);
    if t_stat <= first.0 {
        return first.1;
    }
    if t_stat >= last.0 {
        return last.1;
    }
    TAU_QUANTILES
        .windows(2)
        .find(|w| t_stat <= w[1].0)
        .map(|w| {
            let (x0, p0) = w[0];
            let (x1, p1) = w[1];
            p0 + (p1 - p0) * (t_stat - x0) / (x1 - x0)
        })
        .unwrap_or(last.1)
}
