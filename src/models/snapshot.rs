use crate::error::Result;
use crate::utils::constants::PRICE_LIST_KEY;
use chrono::NaiveDate;
use serde_json::Value;

/// Result of fetching one day of prices.
#[derive(Debug, Clone, PartialEq)]
pub enum DailySnapshot {
    Records(Vec<Value>),
    NoData,
}

impl DailySnapshot {
    /// Parse a daily listing body. Empty bodies, `{}`, `null` and an
    /// absent or empty `ListaEESSPrecio` are all a day without data.
    pub fn from_body(body: &str) -> Result<Self> {
        if body.trim().is_empty() {
            return Ok(DailySnapshot::NoData);
        }

        let value: Value = serde_json::from_str(body)?;
        Ok(Self::from_value(value))
    }

    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(mut object) => match object.remove(PRICE_LIST_KEY) {
                Some(Value::Array(records)) if !records.is_empty() => {
                    DailySnapshot::Records(records)
                }
                _ => DailySnapshot::NoData,
            },
            _ => DailySnapshot::NoData,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            DailySnapshot::Records(records) => records.len(),
            DailySnapshot::NoData => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Outcome of fetching one date of a window.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedDay {
    pub date: NaiveDate,
    pub snapshot: DailySnapshot,
    /// Set when the fetch failed; the failure itself sits in the run's failure log.
    pub failed: bool,
}

impl FetchedDay {
    pub fn ok(date: NaiveDate, snapshot: DailySnapshot) -> Self {
        Self {
            date,
            snapshot,
            failed: false,
        }
    }

    pub fn failed(date: NaiveDate) -> Self {
        Self {
            date,
            snapshot: DailySnapshot::NoData,
            failed: true,
        }
    }
}
