use crate::error::{IngestError, Result};
use crate::models::{DailySnapshot, FetchedDay, ReferenceRecord, StationPriceRecord, TableKind};
use crate::processors::run_report::{FailureKind, FailureLog};
use chrono::NaiveDate;
use rayon::prelude::*;
use serde_json::Value;
use std::collections::HashMap;
use tracing::warn;

/// Canonical rows of one window plus per-date bookkeeping.
#[derive(Debug, Default)]
pub struct WindowRows {
    pub rows: Vec<StationPriceRecord>,
    pub dates_with_data: usize,
    pub empty_dates: usize,
}

/// Pure translation of raw API payloads into canonical rows.
#[derive(Debug, Default, Clone, Copy)]
pub struct ResponseNormalizer;

impl ResponseNormalizer {
    pub fn new() -> Self {
        Self
    }

    /// Rename, date-stamp and blank-clean one day of prices.
    pub fn normalize_prices(
        &self,
        date: NaiveDate,
        snapshot: &DailySnapshot,
    ) -> Result<Vec<StationPriceRecord>> {
        let records = match snapshot {
            DailySnapshot::Records(records) => records,
            DailySnapshot::NoData => return Ok(Vec::new()),
        };

        let table = TableKind::GasPrices;
        records
            .iter()
            .enumerate()
            .map(|(index, raw)| {
                let fields = rename_fields(table, raw, index)?;
                Ok(StationPriceRecord::from_canonical(date, fields))
            })
            .collect()
    }

    /// Select, rename and blank-clean a reference listing.
    pub fn normalize_reference(
        &self,
        table: TableKind,
        records: &[Value],
    ) -> Result<Vec<ReferenceRecord>> {
        if !table.is_reference() {
            return Err(IngestError::Validation(format!(
                "{} is not a reference table",
                table
            )));
        }

        records
            .iter()
            .enumerate()
            .map(|(index, raw)| {
                let mut fields = rename_fields(table, raw, index)?;
                let parent_id = table
                    .parent_column()
                    .and_then(|column| fields.remove(column))
                    .flatten();
                Ok(ReferenceRecord {
                    id: fields.remove("id").flatten(),
                    parent_id,
                    name: fields.remove("name").flatten(),
                })
            })
            .collect()
    }

    /// Normalize the fetched days of a window in parallel. A day whose
    /// payload does not match the expected columns is logged as a failure
    /// and contributes no rows; the other days are unaffected.
    pub fn normalize_window(&self, days: &[FetchedDay], failures: &FailureLog) -> WindowRows {
        let normalized: Vec<(NaiveDate, bool, Result<Vec<StationPriceRecord>>)> = days
            .par_iter()
            .map(|day| {
                (
                    day.date,
                    day.failed,
                    self.normalize_prices(day.date, &day.snapshot),
                )
            })
            .collect();

        let mut window = WindowRows::default();
        for (date, failed, result) in normalized {
            match result {
                Ok(rows) if rows.is_empty() => {
                    if !failed {
                        window.empty_dates += 1;
                    }
                }
                Ok(rows) => {
                    window.dates_with_data += 1;
                    window.rows.extend(rows);
                }
                Err(error) => {
                    warn!(%date, "dropping day: {}", error);
                    failures.record(date, FailureKind::SchemaMismatch, error.to_string());
                }
            }
        }

        window
    }
}

/// Map one raw record to canonical column → value. Every configured raw
/// column must be present; extra raw columns are ignored.
fn rename_fields(
    table: TableKind,
    raw: &Value,
    index: usize,
) -> Result<HashMap<&'static str, Option<String>>> {
    let object = raw.as_object().ok_or_else(|| IngestError::SchemaMismatch {
        table: table.to_string(),
        message: format!("record {} is not a JSON object", index),
    })?;

    let columns = table.config().columns;
    let mut fields = HashMap::with_capacity(columns.len());
    for (raw_name, canonical) in columns {
        let value = object
            .get(*raw_name)
            .ok_or_else(|| IngestError::SchemaMismatch {
                table: table.to_string(),
                message: format!("record {} lacks column '{}'", index, raw_name),
            })?;
        fields.insert(*canonical, canonical_value(value));
    }

    Ok(fields)
}

/// Blank or whitespace-only text and `null` become missing; other scalars
/// are kept as text.
fn canonical_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) if text.trim().is_empty() => None,
        Value::String(text) => Some(text.clone()),
        Value::Bool(_) | Value::Number(_) | Value::Array(_) | Value::Object(_) => {
            Some(value.to_string())
        }
    }
}
