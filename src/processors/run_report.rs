use crate::models::TableKind;
use crate::utils::constants::{EXIT_CANCELLED, EXIT_COMPLETED_WITH_GAPS, EXIT_SUCCESS};
use chrono::NaiveDate;
use std::fmt;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Retries exhausted or non-retryable response.
    Fetch,
    /// Payload did not carry the expected columns.
    SchemaMismatch,
    /// Never attempted because the run was interrupted.
    Cancelled,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FailureKind::Fetch => "fetch",
            FailureKind::SchemaMismatch => "schema mismatch",
            FailureKind::Cancelled => "cancelled",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateFailure {
    pub date: NaiveDate,
    pub kind: FailureKind,
    pub message: String,
}

/// Per-run list of isolated date-level failures, shared by fetch tasks.
#[derive(Debug, Default)]
pub struct FailureLog {
    failures: Mutex<Vec<DateFailure>>,
}

impl FailureLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, date: NaiveDate, kind: FailureKind, message: impl Into<String>) {
        let failure = DateFailure {
            date,
            kind,
            message: message.into(),
        };
        // A poisoned lock still holds valid entries.
        let mut failures = self.failures.lock().unwrap_or_else(|e| e.into_inner());
        failures.push(failure);
    }

    pub fn len(&self) -> usize {
        self.failures.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Failures sorted by date.
    pub fn snapshot(&self) -> Vec<DateFailure> {
        let mut failures = self
            .failures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        failures.sort_by_key(|f| f.date);
        failures
    }
}

/// Summary of one ingestion run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub table: TableKind,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub windows_planned: usize,
    pub windows_committed: usize,
    pub dates_requested: usize,
    pub dates_with_data: usize,
    pub empty_dates: usize,
    pub rows_written: usize,
    pub failures: Vec<DateFailure>,
    pub cancelled: bool,
}

impl RunReport {
    pub fn new(table: TableKind) -> Self {
        Self {
            table,
            start: None,
            end: None,
            windows_planned: 0,
            windows_committed: 0,
            dates_requested: 0,
            dates_with_data: 0,
            empty_dates: 0,
            rows_written: 0,
            failures: Vec::new(),
            cancelled: false,
        }
    }

    /// Every planned window landed and no date was lost.
    pub fn is_complete(&self) -> bool {
        !self.cancelled && self.failures.is_empty() && self.windows_committed == self.windows_planned
    }

    pub fn exit_code(&self) -> u8 {
        if self.cancelled {
            EXIT_CANCELLED
        } else if self.is_complete() {
            EXIT_SUCCESS
        } else {
            EXIT_COMPLETED_WITH_GAPS
        }
    }

    pub fn summary(&self) -> String {
        let mut summary = format!("Ingestion Summary ({}):\n", self.table.table_name());

        if let (Some(start), Some(end)) = (self.start, self.end) {
            summary.push_str(&format!("  Range: {} to {}\n", start, end));
            summary.push_str(&format!(
                "  Dates: {} requested, {} with data, {} empty\n",
                self.dates_requested, self.dates_with_data, self.empty_dates
            ));
        }
        summary.push_str(&format!(
            "  Windows: {}/{} committed\n",
            self.windows_committed, self.windows_planned
        ));
        summary.push_str(&format!("  Rows written: {}\n", self.rows_written));

        if self.cancelled {
            summary.push_str("  Status: cancelled (resume picks up after the last committed window)\n");
        } else if self.is_complete() {
            summary.push_str("  Status: complete\n");
        } else {
            summary.push_str(&format!(
                "  Status: completed with gaps ({} failed dates)\n",
                self.failures.len()
            ));
        }

        for failure in self.failures.iter().take(20) {
            summary.push_str(&format!(
                "    {} [{}]: {}\n",
                failure.date, failure.kind, failure.message
            ));
        }
        if self.failures.len() > 20 {
            summary.push_str(&format!("    ... and {} more\n", self.failures.len() - 20));
        }

        summary
    }
}
