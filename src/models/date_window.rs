use crate::error::{IngestError, Result};
use chrono::NaiveDate;
use std::fmt;

/// Ordered run of calendar dates processed as one fetch-normalize-upload unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateWindow {
    dates: Vec<NaiveDate>,
}

impl DateWindow {
    /// Build a window, rejecting empty, unordered, duplicated or oversized input.
    pub fn new(dates: Vec<NaiveDate>, max_len: usize) -> Result<Self> {
        if dates.is_empty() {
            return Err(IngestError::Validation(
                "A date window cannot be empty".to_string(),
            ));
        }
        if dates.len() > max_len {
            return Err(IngestError::Validation(format!(
                "Date window holds {} dates, limit is {}",
                dates.len(),
                max_len
            )));
        }
        if let Some(pair) = dates.windows(2).find(|pair| pair[0] >= pair[1]) {
            return Err(IngestError::Validation(format!(
                "Dates in a window must be strictly increasing ({} then {})",
                pair[0], pair[1]
            )));
        }

        Ok(Self { dates })
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn first(&self) -> NaiveDate {
        self.dates[0]
    }

    pub fn last(&self) -> NaiveDate {
        self.dates[self.dates.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NaiveDate> {
        self.dates.iter()
    }
}

impl fmt::Display for DateWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.len() == 1 {
            write!(f, "{}", self.first())
        } else {
            write!(f, "{}..{}", self.first(), self.last())
        }
    }
}
