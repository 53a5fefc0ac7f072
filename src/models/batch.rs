use crate::models::{CanonicalRows, TableKind};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WriteDisposition {
    /// Truncate the table, then load.
    Replace,
    /// Add rows to whatever is already there.
    Append,
}

/// Canonical rows of one window, ready to be committed.
#[derive(Debug, Clone)]
pub struct UploadBatch {
    pub table: TableKind,
    pub disposition: WriteDisposition,
    /// Human readable label of the window the rows came from.
    pub window: String,
    pub rows: CanonicalRows,
}

impl UploadBatch {
    /// The disposition always follows the table kind.
    pub fn new(table: TableKind, window: impl Into<String>, rows: CanonicalRows) -> Self {
        Self {
            table,
            disposition: table.disposition(),
            window: window.into(),
            rows,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Warehouse acknowledgment of a durable commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitReceipt {
    pub table: String,
    pub disposition: WriteDisposition,
    pub rows_written: usize,
    /// Part file holding the rows; `None` when nothing had to be written.
    pub part: Option<PathBuf>,
}
