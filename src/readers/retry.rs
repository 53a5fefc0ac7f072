//! Retry with exponential backoff for single remote calls.

use crate::config::RetrySettings;
use crate::error::{IngestError, Result};
use crate::utils::CancelFlag;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff_factor: f64,
    max_backoff: Duration,
    retryable_statuses: Vec<u16>,
}

impl RetryPolicy {
    /// `max_attempts` counts the first call; values below 1 are raised to 1.
    pub fn new(max_attempts: u32) -> Self {
        let defaults = RetrySettings::default();
        Self {
            max_attempts: max_attempts.max(1),
            backoff_factor: defaults.backoff_factor,
            max_backoff: Duration::from_secs(defaults.max_backoff_secs),
            retryable_statuses: defaults.retryable_statuses,
        }
    }

    pub fn from_settings(settings: &RetrySettings) -> Self {
        Self {
            max_attempts: settings.max_attempts.max(1),
            backoff_factor: settings.backoff_factor,
            max_backoff: Duration::from_secs(settings.max_backoff_secs),
            retryable_statuses: settings.retryable_statuses.clone(),
        }
    }

    pub fn with_backoff_factor(mut self, backoff_factor: f64) -> Self {
        self.backoff_factor = backoff_factor.max(0.0);
        self
    }

    pub fn with_max_backoff(mut self, max_backoff: Duration) -> Self {
        self.max_backoff = max_backoff;
        self
    }

    pub fn with_retryable_statuses(mut self, statuses: Vec<u16>) -> Self {
        self.retryable_statuses = statuses;
        self
    }

    /// Whether another attempt may fix `error`.
    pub fn is_retryable(&self, error: &IngestError) -> bool {
        match error {
            IngestError::TransientHttp { .. } => true,
            IngestError::HttpStatus { status, .. } => self.retryable_statuses.contains(status),
            _ => false,
        }
    }

    /// Sleep before retry number `retry` (1-based): `factor * 2^(retry - 1)`
    /// seconds, capped at `max_backoff`.
    pub fn backoff(&self, retry: u32) -> Duration {
        if retry == 0 || self.backoff_factor == 0.0 {
            return Duration::ZERO;
        }
        let exponent = (retry - 1).min(30) as i32;
        let secs = self.backoff_factor * 2f64.powi(exponent);
        Duration::from_secs_f64(secs.min(self.max_backoff.as_secs_f64()))
    }

    /// Run `operation` until it succeeds, fails with a non-retryable error,
    /// or `max_attempts` attempts have been made.
    ///
    /// A non-retryable error is returned as is; running out of retries
    /// returns [`IngestError::RetriesExhausted`] wrapping the last failure.
    pub async fn run<T, F, Fut>(&self, label: &str, operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.run_until_cancelled(label, &CancelFlag::new(), operation)
            .await
    }

    /// Like [`run`](Self::run), but stops with [`IngestError::Cancelled`] as
    /// soon as `cancel` is raised: no new attempt starts and a pending
    /// backoff sleep is cut short.
    pub async fn run_until_cancelled<T, F, Fut>(
        &self,
        label: &str,
        cancel: &CancelFlag,
        mut operation: F,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt: u32 = 0;
        loop {
            if cancel.is_cancelled() {
                debug!(%label, attempt, "cancelled before next attempt");
                return Err(IngestError::Cancelled);
            }
            attempt += 1;
            match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(%label, attempt, "succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(error) if !self.is_retryable(&error) => return Err(error),
                Err(error) if attempt >= self.max_attempts => {
                    return Err(IngestError::RetriesExhausted {
                        attempts: attempt,
                        source: Box::new(error),
                    });
                }
                Err(error) => {
                    let delay = self.backoff(attempt);
                    warn!(
                        %label,
                        attempt,
                        max_attempts = self.max_attempts,
                        ?delay,
                        "transient failure: {}",
                        error
                    );
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = cancel.cancelled() => {
                            debug!(%label, attempt, "cancelled during backoff");
                            return Err(IngestError::Cancelled);
                        }
                    }
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_settings(&RetrySettings::default())
    }
}
