//! Turning transfer checkpoints into a single percentage for display.
//!
//! Progress is purely informational; nothing in the upload path looks at it.

use crate::host_api::Checkpoint;
use std::sync::{Arc, Mutex};

/// Receives the overall completion percentage, `0.0..=100.0`.
pub type ProgressCallback = Arc<dyn Fn(f64) + Send + Sync>;

/// Maps per-attempt checkpoints onto one monotone-within-an-attempt percentage.
///
/// Attempt `k` of `n` starts at `100 * (k - 1) / n` and interpolates towards 100 as the
/// host confirms bytes. A retry can therefore start below where a failed attempt got
/// to; [`ProgressReporter`] hides that from the callback.
#[derive(Debug, Clone, Copy)]
pub struct ProgressEstimator {
    max_attempts: u32,
}

impl ProgressEstimator {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn attempt_started(&self, attempt: u32) -> f64 {
        let done = attempt.saturating_sub(1).min(self.max_attempts);
        100.0 * f64::from(done) / f64::from(self.max_attempts)
    }

    pub fn at_checkpoint(&self, attempt: u32, checkpoint: Checkpoint) -> f64 {
        let start = self.attempt_started(attempt);
        let fraction = checkpoint.fraction().clamp(0.0, 1.0);
        start + (100.0 - start) * fraction
    }
}

/// Forwards percentages to the caller's callback, never letting them go backwards.
pub(crate) struct ProgressReporter {
    callback: Option<ProgressCallback>,
    highest: Mutex<f64>,
}

impl ProgressReporter {
    pub(crate) fn new(callback: Option<ProgressCallback>) -> Self {
        Self {
            callback,
            highest: Mutex::new(0.0),
        }
    }

    /// Reports `percent`, or the highest value reported so far if that is larger.
    pub(crate) fn report(&self, percent: f64) {
        let Some(callback) = &self.callback else {
            return;
        };
        let shown = {
            let mut highest = self.highest.lock().unwrap_or_else(|e| e.into_inner());
            *highest = (*highest).max(percent);
            *highest
        };
        callback(shown);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cp(uploaded_bytes: u64) -> Checkpoint {
        Checkpoint {
            uploaded_bytes,
            total_size: 400,
        }
    }

    #[test]
    fn first_attempt_spans_everything() {
        let p = ProgressEstimator::new(3);
        assert_eq!(p.attempt_started(1), 0.0);
        assert_eq!(p.at_checkpoint(1, cp(100)), 25.0);
        assert_eq!(p.at_checkpoint(1, cp(400)), 100.0);
    }

    #[test]
    fn later_attempts_start_further_along() {
        let p = ProgressEstimator::new(4);
        assert_eq!(p.attempt_started(2), 25.0);
        assert_eq!(p.attempt_started(3), 50.0);
        assert_eq!(p.at_checkpoint(3, cp(200)), 75.0);
        assert_eq!(p.at_checkpoint(3, cp(400)), 100.0);
    }

    #[test]
    fn zero_attempts_is_treated_as_one() {
        let p = ProgressEstimator::new(0);
        assert_eq!(p.attempt_started(1), 0.0);
        assert_eq!(p.at_checkpoint(1, cp(400)), 100.0);
    }

    #[test]
    fn reporter_never_goes_backwards() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let callback: ProgressCallback = Arc::new({
            let seen = Arc::clone(&seen);
            move |pct: f64| seen.lock().unwrap().push(pct)
        });
        let reporter = ProgressReporter::new(Some(callback));

        let p = ProgressEstimator::new(2);
        // first attempt gets three quarters of the way, then fails
        reporter.report(p.attempt_started(1));
        reporter.report(p.at_checkpoint(1, cp(300)));
        // second attempt restarts at 50%
        reporter.report(p.attempt_started(2));
        reporter.report(p.at_checkpoint(2, cp(300)));
        reporter.report(p.at_checkpoint(2, cp(400)));

        assert_eq!(*seen.lock().unwrap(), vec![0.0, 75.0, 75.0, 87.5, 100.0]);
    }

    #[test]
    fn reporter_without_callback_is_silent() {
        ProgressReporter::new(None).report(42.0);
    }
}
