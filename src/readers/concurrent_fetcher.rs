use crate::error::{IngestError, Result};
use crate::models::{DateWindow, FetchedDay, TableKind};
use crate::processors::run_report::{FailureKind, FailureLog};
use crate::readers::{PriceSource, RetryPolicy};
use crate::utils::constants::MAX_CONNECTIONS_LIMIT;
use crate::utils::CancelFlag;
use chrono::{Local, NaiveDate};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Fetches every date of a window with at most `max_connections` requests
/// outstanding. A date that cannot be fetched is logged in the run's
/// [`FailureLog`] and comes back empty; it never fails its siblings.
/// `max_connections` is clamped to `1..=MAX_CONNECTIONS_LIMIT`.
pub struct ConcurrentFetcher<S: PriceSource + 'static> {
    source: Arc<S>,
    retry: Arc<RetryPolicy>,
    max_connections: usize,
    today: NaiveDate,
    failures: Arc<FailureLog>,
    cancel: CancelFlag,
}

impl<S: PriceSource + 'static> ConcurrentFetcher<S> {
    pub fn new(source: Arc<S>, max_connections: usize) -> Self {
        Self {
            source,
            retry: Arc::new(RetryPolicy::default()),
            max_connections: max_connections.clamp(1, MAX_CONNECTIONS_LIMIT),
            today: Local::now().date_naive(),
            failures: Arc::new(FailureLog::new()),
            cancel: CancelFlag::new(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = Arc::new(retry);
        self
    }

    /// Date served by the current-day endpoint instead of the historical one.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    pub fn with_failure_log(mut self, failures: Arc<FailureLog>) -> Self {
        self.failures = failures;
        self
    }

    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn failures(&self) -> &Arc<FailureLog> {
        &self.failures
    }

    /// One [`FetchedDay`] per date of `window`, in window order.
    pub async fn fetch_window(&self, window: &DateWindow) -> Result<Vec<FetchedDay>> {
        let semaphore = Arc::new(Semaphore::new(self.max_connections));
        let mut join_set = JoinSet::new();

        for (index, &date) in window.iter().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            let source = Arc::clone(&self.source);
            let retry = Arc::clone(&self.retry);
            let failures = Arc::clone(&self.failures);
            let cancel = self.cancel.clone();
            let today = self.today;

            join_set.spawn(async move {
                // The permit is held until the request and all its retries finish.
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return (index, FetchedDay::failed(date)),
                };

                let label = date.to_string();
                let result = if date == today {
                    retry
                        .run_until_cancelled(&label, &cancel, || source.fetch_current())
                        .await
                } else {
                    retry
                        .run_until_cancelled(&label, &cancel, || source.fetch_historical(date))
                        .await
                };

                match result {
                    Ok(snapshot) => {
                        debug!(%date, records = snapshot.len(), "fetched");
                        (index, FetchedDay::ok(date, snapshot))
                    }
                    Err(IngestError::Cancelled) => {
                        failures.record(date, FailureKind::Cancelled, "run interrupted");
                        (index, FetchedDay::failed(date))
                    }
                    Err(error) => {
                        let error = IngestError::Fetch {
                            date,
                            source: Box::new(error),
                        };
                        warn!("{}", error);
                        failures.record(date, FailureKind::Fetch, error.to_string());
                        (index, FetchedDay::failed(date))
                    }
                }
            });
        }

        let mut slots: Vec<Option<FetchedDay>> = vec![None; window.len()];
        while let Some(joined) = join_set.join_next().await {
            let (index, day) = joined?;
            slots[index] = Some(day);
        }

        Ok(slots
            .into_iter()
            .zip(window.iter())
            .map(|(slot, date)| slot.unwrap_or_else(|| FetchedDay::failed(*date)))
            .collect())
    }

    /// Fetch a reference listing. There is only one request, so its failure
    /// is returned rather than isolated.
    pub async fn fetch_reference(&self, table: TableKind) -> Result<Vec<Value>> {
        let label = table.to_string();
        self.retry
            .run_until_cancelled(&label, &self.cancel, || self.source.fetch_reference(table))
            .await
    }
}
