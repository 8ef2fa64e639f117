//! Sequential candidate search with early-exit rules.
//!
//! The search knows nothing about training: it calls an objective per
//! candidate and applies the [`SeedSearchPolicy`] to the scores.

use crate::config::SeedSearchPolicy;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

/// What happened to one candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TrialOutcome {
    Scored(f64),
    /// A recoverable error; the message is kept for reporting.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialRecord<C> {
    pub candidate: C,
    pub outcome: TrialOutcome,
}

impl<C> TrialRecord<C> {
    pub fn score(&self) -> Option<f64> {
        match self.outcome {
            TrialOutcome::Scored(score) => Some(score),
            TrialOutcome::Failed(_) => None,
        }
    }
}

/// Why the search ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    /// A candidate scored at or below the baseline.
    BeatBaseline,
    /// Every trial so far was worse than the baseline by more than the
    /// abandon margin.
    Abandoned,
    /// All candidates were tried.
    Exhausted,
}

/// Lowest-scoring candidate and the value its objective produced.
#[derive(Debug, Clone, PartialEq)]
pub struct BestTrial<C, T> {
    pub candidate: C,
    pub score: f64,
    pub value: T,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome<C, T> {
    /// `None` when every attempted candidate failed.
    pub best: Option<BestTrial<C, T>>,
    /// One record per attempted candidate, in order.
    pub trials: Vec<TrialRecord<C>>,
    pub stop_reason: StopReason,
}

/// Try `candidates` in order, scoring each with `objective` (lower is
/// better) against `baseline`.
///
/// Stops as soon as a score is `<= baseline` when
/// `early_exit_le_baseline` is set, or once at least
/// `min_trials_before_abandon` trials have run and all of them are worse
/// than `baseline * (1 + abandon_margin)`; failed trials count as worse.
/// Recoverable errors are recorded and skipped, any other error is
/// returned immediately.
#[instrument(skip_all, fields(candidates = candidates.len(), baseline = baseline))]
pub fn run_seed_search<C, T, F>(
    candidates: &[C],
    baseline: f64,
    policy: &SeedSearchPolicy,
    mut objective: F,
) -> Result<SearchOutcome<C, T>>
where
    C: Clone + std::fmt::Debug,
    F: FnMut(&C) -> Result<(f64, T)>,
{
    let abandon_above = baseline * (1.0 + policy.abandon_margin);
    let mut best: Option<BestTrial<C, T>> = None;
    let mut trials: Vec<TrialRecord<C>> = Vec::with_capacity(candidates.len());

    for candidate in candidates {
        let outcome = match objective(candidate) {
            Ok((score, value)) if !score.is_nan() => {
                debug!(?candidate, score, "trial scored");
                if best.as_ref().map_or(true, |b| score < b.score) {
                    best = Some(BestTrial {
                        candidate: candidate.clone(),
                        score,
                        value,
                    });
                }
                TrialOutcome::Scored(score)
            }
            Ok(_) => {
                warn!(?candidate, "trial produced a NaN score");
                TrialOutcome::Failed("score is NaN".to_string())
            }
            Err(err) if err.is_recoverable() => {
                warn!(?candidate, error = %err, "trial failed, trying next candidate");
                TrialOutcome::Failed(err.to_string())
            }
            Err(err) => return Err(err),
        };
        trials.push(TrialRecord {
            candidate: candidate.clone(),
            outcome,
        });

        let last = trials.last().and_then(TrialRecord::score);
        if policy.early_exit_le_baseline && last.is_some_and(|s| s <= baseline) {
            info!(?candidate, "candidate matched the baseline, stopping");
            return Ok(SearchOutcome {
                best,
                trials,
                stop_reason: StopReason::BeatBaseline,
            });
        }

        let all_worse = trials
            .iter()
            .all(|t| t.score().map_or(true, |s| s > abandon_above));
        if trials.len() >= policy.min_trials_before_abandon && all_worse {
            info!(trials = trials.len(), "no candidate near the baseline, abandoning");
            return Ok(SearchOutcome {
                best,
                trials,
                stop_reason: StopReason::Abandoned,
            });
        }
    }

    Ok(SearchOutcome {
        best,
        trials,
        stop_reason: StopReason::Exhausted,
    })
}

/// Swap a quick-search result for a longer retrain unless the retrain
/// scores above `quick_score * (1 + tolerance)`.
///
/// A recoverable retrain error keeps the quick result; any other error
/// propagates. Returns the kept score, the kept value and whether the
/// retrain replaced the quick result.
pub fn guarded_retrain<T, F>(
    quick_score: f64,
    quick: T,
    tolerance: f64,
    retrain: F,
) -> Result<(f64, T, bool)>
where
    F: FnOnce() -> Result<(f64, T)>,
{
    let (score, value) = match retrain() {
        Ok(result) => result,
        Err(err) if err.is_recoverable() => {
            warn!(error = %err, "retrain failed, keeping quick-search result");
            return Ok((quick_score, quick, false));
        }
        Err(err) => return Err(err),
    };

    let limit = quick_score * (1.0 + tolerance);
    if score.is_nan() || score > limit {
        warn!(
            quick_score,
            retrain_score = score,
            "retrain regressed, keeping quick-search result"
        );
        return Ok((quick_score, quick, false));
    }
    debug!(quick_score, retrain_score = score, "retrain kept");
    Ok((score, value, true))
}
