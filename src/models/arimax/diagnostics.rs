//! Validity checks on a fitted ARIMAX model.

use crate::models::arimax::model::FittedArimax;
use crate::simd;
use crate::validation::residual_tests::{ljung_box, normality_check, LjungBoxResult, NormalityCheck};
use serde::{Deserialize, Serialize};

/// Two-sided 5% critical value of the standard normal.
pub const SIGNIFICANCE_Z: f64 = 1.96;

/// Outcome of the stability, invertibility and significance checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    /// Every AR coefficient has magnitude below one.
    pub stable: bool,
    /// Every MA coefficient has magnitude below one.
    pub invertible: bool,
    /// Every AR, MA and wind coefficient has `|z| > 1.96`.
    pub significant: bool,
    pub aic: f64,
    pub bic: f64,
    /// One entry per failed check.
    pub failures: Vec<String>,
}

impl Diagnostics {
    pub fn accepted(&self) -> bool {
        self.stable && self.invertible && self.significant
    }

    /// All failed checks joined with `"; "`, `None` when accepted.
    pub fn reason(&self) -> Option<String> {
        (!self.failures.is_empty()).then(|| self.failures.join("; "))
    }
}

/// Check stability, invertibility and coefficient significance.
///
/// The intercept is excluded from the significance check. Every failing
/// check contributes to the reason, not just the first.
pub fn diagnose(model: &FittedArimax) -> Diagnostics {
    let mut failures = Vec::new();

    let explosive: Vec<String> = lag_violations("ar", model.ar_coefficients());
    let stable = explosive.is_empty();
    if !stable {
        failures.push(format!("not stable: {}", explosive.join(", ")));
    }

    let non_invertible = lag_violations("ma", model.ma_coefficients());
    let invertible = non_invertible.is_empty();
    if !invertible {
        failures.push(format!("not invertible: {}", non_invertible.join(", ")));
    }

    let weak: Vec<String> = model
        .parameters()
        .iter()
        .filter(|p| p.name != "intercept" && !p.is_significant(SIGNIFICANCE_Z))
        .map(|p| match p.z_value {
            Some(z) => format!("{} (|z| = {:.2})", p.name, z.abs()),
            None => format!("{} (not identified)", p.name),
        })
        .collect();
    let significant = weak.is_empty();
    if !significant {
        failures.push(format!("not significant: {}", weak.join(", ")));
    }

    Diagnostics {
        stable,
        invertible,
        significant,
        aic: model.aic(),
        bic: model.bic(),
        failures,
    }
}

fn lag_violations(prefix: &str, coefficients: &[f64]) -> Vec<String> {
    coefficients
        .iter()
        .enumerate()
        .filter(|(_, c)| c.abs() >= 1.0)
        .map(|(i, c)| format!("|{prefix}.L{}| = {:.3} >= 1", i + 1, c.abs()))
        .collect()
}

/// Informational residual summary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResidualReport {
    pub mean: f64,
    pub std_dev: f64,
    pub normality: NormalityCheck,
    pub ljung_box: LjungBoxResult,
}

/// Location, spread, normality and autocorrelation of the in-sample
/// residuals.
pub fn residual_report(model: &FittedArimax) -> ResidualReport {
    let residuals = model.residuals();
    let order = model.order();
    ResidualReport {
        mean: simd::mean(&residuals),
        std_dev: simd::variance(&residuals).sqrt(),
        normality: normality_check(&residuals),
        ljung_box: ljung_box(&residuals, None, order.p + order.q),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TimeSeries;
    use crate::models::arimax::model::{ArimaxCoefficients, ArimaxOrder};
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn make_timestamps(n: usize) -> Vec<DateTime<Utc>> {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        (0..n).map(|i| base + Duration::hours(i as i64)).collect()
    }

    fn noise(i: usize) -> f64 {
        let x = (i as f64 * 12.9898 + 78.233).sin() * 43758.5453;
        x - x.floor() - 0.5
    }

    fn series(n: usize) -> TimeSeries {
        let wind: Vec<f64> = (0..n).map(|i| 6.0 + 2.0 * (i as f64 * 0.3).sin()).collect();
        let mut u = 0.0;
        let wave = (0..n)
            .map(|i| {
                u = 0.7 * u + 0.1 * noise(i);
                1.0 + 0.3 * wind[i] + u
            })
            .collect();
        TimeSeries::new(make_timestamps(n), wave, wind).unwrap()
    }

    fn with_coefficients(ar: Vec<f64>, ma: Vec<f64>) -> FittedArimax {
        let order = ArimaxOrder::new(ar.len(), 0, ma.len());
        let coefficients = ArimaxCoefficients {
            intercept: 1.0,
            exog: 0.3,
            ar,
            ma,
        };
        FittedArimax::from_coefficients(&series(120), order, coefficients).unwrap()
    }

    #[test]
    fn explosive_ar_is_unstable() {
        let diagnostics = diagnose(&with_coefficients(vec![1.2], vec![]));

        assert!(!diagnostics.stable);
        assert!(!diagnostics.accepted());
        let reason = diagnostics.reason().unwrap();
        assert!(reason.contains("not stable"));
        assert!(reason.contains("ar.L1"));
    }

    #[test]
    fn unit_ar_is_unstable() {
        assert!(!diagnose(&with_coefficients(vec![1.0], vec![])).stable);
    }

    #[test]
    fn every_failed_check_is_reported() {
        let diagnostics = diagnose(&with_coefficients(vec![-1.5], vec![1.1]));

        assert!(!diagnostics.stable);
        assert!(!diagnostics.invertible);
        let reason = diagnostics.reason().unwrap();
        assert!(reason.contains("not stable"));
        assert!(reason.contains("not invertible"));
        assert_eq!(diagnostics.failures.len(), reason.split("; ").count());
    }

    #[test]
    fn well_specified_fit_is_accepted() {
        let model = FittedArimax::fit(&series(300), ArimaxOrder::new(1, 0, 0)).unwrap();
        let diagnostics = diagnose(&model);

        assert!(diagnostics.stable);
        assert!(diagnostics.invertible);
        assert!(diagnostics.significant, "{:?}", diagnostics.reason());
        assert!(diagnostics.accepted());
        assert!(diagnostics.reason().is_none());
    }

    #[test]
    fn unidentified_wind_is_not_significant() {
        let n = 80;
        let wave: Vec<f64> = (0..n).map(|i| 2.0 + 0.05 * i as f64 + 0.1 * noise(i)).collect();
        let ts = TimeSeries::new(make_timestamps(n), wave, vec![4.0; n]).unwrap();
        let model = FittedArimax::fit(&ts, ArimaxOrder::new(1, 1, 0)).unwrap();
        let diagnostics = diagnose(&model);

        assert!(!diagnostics.significant);
        assert!(diagnostics.reason().unwrap().contains("wind_speed (not identified)"));
    }

    #[test]
    fn residual_report_is_finite() {
        let model = FittedArimax::fit(&series(150), ArimaxOrder::new(1, 0, 0)).unwrap();
        let report = residual_report(&model);

        assert!(report.ljung_box.statistic.is_finite());
        assert!(report.normality.kurtosis.is_finite());
        assert!(report.std_dev > 0.0);
        assert!(report.mean.abs() < report.std_dev);
    }
}
