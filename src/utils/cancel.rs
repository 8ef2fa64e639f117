//! Cooperative cancellation for long-running training loops.

use crate::error::{ForecastError, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared flag a caller flips to stop training between epochs or seeds.
///
/// Clones observe the same flag.
///
/// # Example
/// ```
/// use wavecast::utils::CancellationToken;
///
/// let token = CancellationToken::new();
/// let worker_view = token.clone();
/// token.cancel();
/// assert!(worker_view.is_cancelled());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Fail with [`ForecastError::Cancelled`] naming `stage` if cancelled.
    pub fn check(&self, stage: impl FnOnce() -> String) -> Result<()> {
        if self.is_cancelled() {
            return Err(ForecastError::Cancelled(stage()));
        }
        Ok(())
    }
}
