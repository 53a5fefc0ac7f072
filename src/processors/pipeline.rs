use crate::config::IngestSettings;
use crate::error::{IngestError, Result};
use crate::models::{validate_registry, CanonicalRows, TableKind, UploadBatch};
use crate::planner::{DateRangePlanner, RangeRequest};
use crate::processors::normalizer::ResponseNormalizer;
use crate::processors::run_report::{FailureLog, RunReport};
use crate::readers::{ConcurrentFetcher, PriceSource, RetryPolicy};
use crate::utils::constants::{DEFAULT_MAX_CONNECTIONS, MAX_CONNECTIONS_LIMIT};
use crate::utils::{CancelFlag, ProgressReporter};
use crate::writers::{BatchUploader, Warehouse};
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{info, warn};

/// Plan, fetch, normalize and commit one table, one window at a time.
pub struct IngestPipeline<S: PriceSource + 'static, W: Warehouse + 'static> {
    source: Arc<S>,
    uploader: BatchUploader<W>,
    planner: DateRangePlanner,
    retry: RetryPolicy,
    max_connections: usize,
    normalizer: ResponseNormalizer,
    cancel: CancelFlag,
    show_progress: bool,
}

impl<S: PriceSource + 'static, W: Warehouse + 'static> IngestPipeline<S, W> {
    pub fn new(source: Arc<S>, warehouse: Arc<W>) -> Self {
        Self {
            source,
            uploader: BatchUploader::new(warehouse),
            planner: DateRangePlanner::default(),
            retry: RetryPolicy::default(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            normalizer: ResponseNormalizer::new(),
            cancel: CancelFlag::new(),
            show_progress: false,
        }
    }

    /// Apply the fetch and retry sections of the run settings.
    pub fn with_settings(self, settings: &IngestSettings) -> Result<Self> {
        Ok(self
            .with_batch_size(settings.fetch.batch_size)?
            .with_max_connections(settings.fetch.max_connections)
            .with_retry_policy(RetryPolicy::from_settings(&settings.retry)))
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Result<Self> {
        self.planner = DateRangePlanner::new(batch_size)?;
        Ok(self)
    }

    pub fn with_max_connections(mut self, max_connections: usize) -> Self {
        self.max_connections = max_connections.clamp(1, MAX_CONNECTIONS_LIMIT);
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn warehouse(&self) -> &Arc<W> {
        self.uploader.warehouse()
    }

    /// Ingest `table`. Date-level failures end up in the report; range,
    /// reference-fetch and upload errors abort the run.
    pub async fn run(
        &self,
        table: TableKind,
        request: RangeRequest,
        today: NaiveDate,
    ) -> Result<RunReport> {
        validate_registry()?;

        if table.is_reference() {
            self.run_reference(table).await
        } else {
            self.run_prices(request, today).await
        }
    }

    fn fetcher(&self, today: NaiveDate, failures: Arc<FailureLog>) -> ConcurrentFetcher<S> {
        ConcurrentFetcher::new(Arc::clone(&self.source), self.max_connections)
            .with_retry_policy(self.retry.clone())
            .with_today(today)
            .with_failure_log(failures)
            .with_cancel_flag(self.cancel.clone())
    }

    async fn run_prices(&self, request: RangeRequest, today: NaiveDate) -> Result<RunReport> {
        let table = TableKind::GasPrices;
        let mut report = RunReport::new(table);

        let last_ingested = if request.resume && request.start.is_none() {
            let last = self.warehouse().max_date(table)?;
            match last {
                Some(date) => info!("Resuming after last ingested date {}", date),
                None => info!("{} is empty, nothing to resume from", table.table_name()),
            }
            last
        } else {
            None
        };

        let (start, end) = self.planner.resolve(request, last_ingested, today)?;
        let windows = self.planner.plan(start, end)?;

        report.start = Some(start);
        report.end = Some(end);
        report.windows_planned = windows.len();
        report.dates_requested = windows.iter().map(|w| w.len()).sum();

        info!(
            "Ingesting {} dates ({} to {}) in {} windows of up to {} days",
            report.dates_requested,
            start,
            end,
            windows.len(),
            self.planner.batch_size()
        );

        let failures = Arc::new(FailureLog::new());
        let fetcher = self.fetcher(today, Arc::clone(&failures));
        let progress = ProgressReporter::new(
            report.dates_requested as u64,
            "Fetching fuel prices",
            !self.show_progress,
        );

        for window in &windows {
            if self.cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }

            progress.set_message(&format!("Window {}", window));
            let days = fetcher.fetch_window(window).await?;

            // A window interrupted mid-fetch is incomplete and must not land.
            if self.cancel.is_cancelled() {
                warn!("Interrupted during window {}, not uploading it", window);
                report.cancelled = true;
                break;
            }

            let normalizer = self.normalizer;
            let window_failures = Arc::clone(&failures);
            let rows = tokio::task::spawn_blocking(move || {
                normalizer.normalize_window(&days, &window_failures)
            })
            .await?;

            report.dates_with_data += rows.dates_with_data;
            report.empty_dates += rows.empty_dates;

            let batch = UploadBatch::new(table, window.to_string(), CanonicalRows::Prices(rows.rows));
            let receipt = self.uploader.upload(batch).await?;

            report.rows_written += receipt.rows_written;
            report.windows_committed += 1;
            progress.increment(window.len() as u64);
        }

        report.failures = failures.snapshot();
        if report.cancelled {
            progress.abandon();
        } else {
            progress.finish_with_message(&format!("{} rows written", report.rows_written));
        }

        Ok(report)
    }

    async fn run_reference(&self, table: TableKind) -> Result<RunReport> {
        let mut report = RunReport::new(table);
        report.windows_planned = 1;

        let failures = Arc::new(FailureLog::new());
        let fetcher = self.fetcher(chrono::Local::now().date_naive(), failures);
        let progress = ProgressReporter::new_spinner(
            &format!("Fetching {} listing", table),
            !self.show_progress,
        );

        let records = match fetcher.fetch_reference(table).await {
            Ok(records) => records,
            Err(IngestError::Cancelled) => {
                warn!("Interrupted while fetching {} listing", table);
                report.cancelled = true;
                progress.abandon();
                return Ok(report);
            }
            Err(error) => return Err(error),
        };
        let rows = self.normalizer.normalize_reference(table, &records)?;

        if self.cancel.is_cancelled() {
            report.cancelled = true;
            progress.abandon();
            return Ok(report);
        }

        let batch = UploadBatch::new(table, table.to_string(), CanonicalRows::Reference(rows));
        let receipt = self.uploader.upload(batch).await?;

        report.rows_written = receipt.rows_written;
        report.windows_committed = 1;
        progress.finish_with_message(&format!("{} rows written", report.rows_written));

        Ok(report)
    }
}
