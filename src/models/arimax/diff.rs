//! Differencing and integration for the I(d) part of ARIMAX.

/// Difference `series` `d` times.
///
/// Each pass shortens the series by one; an exhausted series stays empty.
pub fn difference(series: &[f64], d: usize) -> Vec<f64> {
    let mut result = series.to_vec();
    for _ in 0..d {
        if result.len() <= 1 {
            return Vec::new();
        }
        result = result.windows(2).map(|w| w[1] - w[0]).collect();
    }
    result
}

/// Difference `future` values as a continuation of `history`.
///
/// Returns one differenced value per future entry, using the last `d`
/// history values as the starting conditions.
pub fn difference_continuation(history: &[f64], future: &[f64], d: usize) -> Vec<f64> {
    if d == 0 {
        return future.to_vec();
    }
    let tail = &history[history.len().saturating_sub(d)..];
    let mut joined = tail.to_vec();
    joined.extend_from_slice(future);
    let mut diffed = difference(&joined, d);
    let excess = diffed.len().saturating_sub(future.len());
    diffed.drain(..excess);
    diffed
}

/// Undo `d` differences of a continuation of `original`.
///
/// Level `k` is seeded with the last value of `original` differenced `k`
/// times, then cumulatively summed.
pub fn integrate(differenced: &[f64], original: &[f64], d: usize) -> Vec<f64> {
    let mut result = differenced.to_vec();
    for level in (0..d).rev() {
        let mut acc = difference(original, level).last().copied().unwrap_or(0.0);
        for value in result.iter_mut() {
            acc += *value;
            *value = acc;
        }
    }
    result
}
