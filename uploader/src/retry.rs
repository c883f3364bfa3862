//! Bounded retries around complete upload attempts.

use crate::error::UploadError;
use crate::host_api::VideoHostClient;
use crate::metadata::{UploadMetadata, VideoBlob};
use crate::probe;
use crate::progress::{ProgressCallback, ProgressEstimator, ProgressReporter};
use crate::result::UploadResult;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

/// Reference budget for one whole upload, retries included.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// How often, and how patiently, to retry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Zero is treated as one.
    pub max_attempts: u32,
    /// Wait after the first failure; doubles after each further failure.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// The number of attempts [`RetryPolicy::run`] makes at most, never less than one.
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// The pause after failed attempt number `attempt` (1-based): `base * 2^(attempt-1)`.
    pub fn backoff_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1 << exponent)
    }

    /// Runs `op` until it succeeds, fails with a non-retryable error, or the attempts
    /// run out. `op` receives the 1-based attempt number.
    ///
    /// There is no pause after the final attempt. Exhaustion is reported as
    /// [`UploadError::RetriesExhausted`] wrapping the last failure.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T, UploadError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, UploadError>>,
    {
        let attempts = self.attempts();
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) if attempt >= attempts => {
                    tracing::warn!(attempts, error = %e, "giving up");
                    return Err(UploadError::RetriesExhausted {
                        attempts,
                        last: Box::new(e),
                    });
                }
                Err(e) => {
                    let delay = self.backoff_after(attempt);
                    tracing::warn!(attempt, attempts, ?delay, error = %e, "attempt failed, backing off");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

/// Knobs for [`VideoHostClient::upload_with_retry`].
#[derive(Clone)]
pub struct UploadOptions {
    pub retry: RetryPolicy,
    /// Budget for the whole call, across all attempts and pauses.
    pub timeout: Duration,
    pub cancel: CancellationToken,
    pub on_progress: Option<ProgressCallback>,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            timeout: DEFAULT_TIMEOUT,
            cancel: CancellationToken::new(),
            on_progress: None,
        }
    }
}

impl std::fmt::Debug for UploadOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadOptions")
            .field("retry", &self.retry)
            .field("timeout", &self.timeout)
            .field("cancelled", &self.cancel.is_cancelled())
            .field("on_progress", &self.on_progress.is_some())
            .finish()
    }
}

impl UploadOptions {
    pub fn max_retries(mut self, max_attempts: u32) -> Self {
        self.retry.max_attempts = max_attempts;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn cancel_with(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn on_progress(mut self, f: impl Fn(f64) + Send + Sync + 'static) -> Self {
        self.on_progress = Some(Arc::new(f));
        self
    }
}

impl VideoHostClient {
    /// Uploads `blob`, retrying whole attempts with exponential backoff.
    ///
    /// The recording's duration is probed once, up front, and attached to the
    /// metadata; an undeterminable duration is reported as 0 rather than failing.
    /// Every attempt creates a fresh session.
    ///
    /// `options.timeout` bounds the whole call, pauses between attempts included, and
    /// cancelling `options.cancel` interrupts it at any point. Either drops whatever
    /// request is in flight.
    ///
    /// Failures come back as an unsuccessful [`UploadResult`] carrying the last
    /// concrete error. The one exception is missing configuration, which is returned
    /// as `Err` since no amount of retrying will help.
    #[instrument(skip_all, fields(bytes = blob.len(), content_type = blob.content_type()))]
    pub async fn upload_with_retry(
        &self,
        blob: &VideoBlob,
        mut metadata: UploadMetadata,
        options: UploadOptions,
    ) -> Result<UploadResult, UploadError> {
        let duration = match probe::probe_duration(blob.bytes()) {
            Some(d) => d.as_secs_f64(),
            None => {
                tracing::warn!("could not determine recording duration, reporting 0");
                0.0
            }
        };
        metadata.duration_secs = Some(duration);

        let reporter = ProgressReporter::new(options.on_progress.clone());
        let estimator = ProgressEstimator::new(options.retry.attempts());
        let deadline = tokio::time::Instant::now() + options.timeout;
        let cancel = &options.cancel;
        let metadata = &metadata;
        let reporter = &reporter;

        let attempts = options.retry.run(|attempt| async move {
            tracing::debug!(attempt, "starting upload attempt");
            reporter.report(estimator.attempt_started(attempt));
            self.upload_video(blob, metadata, cancel, |checkpoint| {
                reporter.report(estimator.at_checkpoint(attempt, checkpoint))
            })
            .await
        });
        // the deadline and cancellation also cover the pauses between attempts
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(UploadError::Cancelled),
            r = tokio::time::timeout_at(deadline, attempts) => {
                r.unwrap_or(Err(UploadError::Timeout(options.timeout)))
            }
        };

        match outcome {
            Ok(video) => {
                reporter.report(100.0);
                Ok(UploadResult::succeeded(video))
            }
            Err(e @ UploadError::Configuration(_)) => Err(e),
            Err(e) => {
                tracing::error!(error = %e, "video upload failed");
                Ok(UploadResult::failed(&e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tokio::time::Instant;

    fn policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            ..RetryPolicy::default()
        }
    }

    #[test]
    fn backoff_doubles() {
        let p = RetryPolicy::default();
        assert_eq!(p.backoff_after(1), Duration::from_secs(1));
        assert_eq!(p.backoff_after(2), Duration::from_secs(2));
        assert_eq!(p.backoff_after(3), Duration::from_secs(4));
        assert_eq!(p.backoff_after(4), Duration::from_secs(8));
    }

    #[tokio::test(start_paused = true)]
    async fn exhausts_exactly_n_attempts_with_growing_pauses() {
        let started = Instant::now();
        let calls = Mutex::new(Vec::new());

        let result: Result<(), _> = policy(4)
            .run(|attempt| {
                calls.lock().unwrap().push((attempt, started.elapsed()));
                async move {
                    Err(UploadError::Initiation(format!("attempt {attempt} refused")))
                }
            })
            .await;

        let calls = calls.into_inner().unwrap();
        assert_eq!(
            calls,
            vec![
                (1, Duration::ZERO),
                (2, Duration::from_secs(1)),
                (3, Duration::from_secs(3)),
                (4, Duration::from_secs(7)),
            ]
        );
        // no pause after the final attempt
        assert_eq!(started.elapsed(), Duration::from_secs(7));

        let err = result.unwrap_err();
        assert_eq!(
            err.to_string(),
            "All 4 upload attempts failed: could not initiate resumable upload: attempt 4 refused"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn stops_at_first_success() {
        let mut calls = 0;
        let result = policy(3)
            .run(|attempt| {
                calls += 1;
                async move {
                    if attempt < 2 {
                        Err(UploadError::TokenExpiredDuringUpload { offset: 0 })
                    } else {
                        Ok(attempt)
                    }
                }
            })
            .await;
        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn fatal_errors_short_circuit() {
        let mut calls = 0;
        let result: Result<(), _> = policy(3)
            .run(|_| {
                calls += 1;
                async { Err(UploadError::Configuration("no refresh token".into())) }
            })
            .await;
        assert!(matches!(result, Err(UploadError::Configuration(_))));
        assert_eq!(calls, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_attempts_still_tries_once() {
        let mut calls = 0;
        let result: Result<(), _> = policy(0)
            .run(|_| {
                calls += 1;
                async { Err(UploadError::Initiation("nope".into())) }
            })
            .await;
        assert!(matches!(
            result,
            Err(UploadError::RetriesExhausted { attempts: 1, .. })
        ));
        assert_eq!(calls, 1);
    }
}
