use crate::error::{IngestError, Result};
use crate::models::DateWindow;
use crate::utils::constants::DEFAULT_BATCH_SIZE;
use chrono::NaiveDate;
use tracing::debug;

/// How the caller asked for the range to be chosen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RangeRequest {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    /// Start the day after the latest date already in the warehouse.
    pub resume: bool,
}

/// Turns a [`RangeRequest`] into an inclusive date range and cuts it into
/// windows of at most `batch_size` days.
#[derive(Debug, Clone, Copy)]
pub struct DateRangePlanner {
    batch_size: usize,
}

impl DateRangePlanner {
    pub fn new(batch_size: usize) -> Result<Self> {
        if batch_size == 0 {
            return Err(IngestError::Validation(
                "batch_size must be at least 1".to_string(),
            ));
        }
        Ok(Self { batch_size })
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Pick the inclusive range to ingest.
    ///
    /// An explicit start wins. Otherwise resume mode starts the day after
    /// `last_ingested` when the table has rows, and everything else starts
    /// yesterday. The end defaults to `today`.
    pub fn resolve(
        &self,
        request: RangeRequest,
        last_ingested: Option<NaiveDate>,
        today: NaiveDate,
    ) -> Result<(NaiveDate, NaiveDate)> {
        let end = request.end.unwrap_or(today);
        let start = match (request.start, request.resume, last_ingested) {
            (Some(start), _, _) => start,
            (None, true, Some(last)) => last.succ_opt().ok_or_else(|| {
                IngestError::Validation(format!("cannot resume after {}", last))
            })?,
            _ => today.pred_opt().unwrap_or(today),
        };

        if start > end {
            return Err(IngestError::InvalidRange { start, end });
        }

        debug!(%start, %end, resume = request.resume, "resolved range");
        Ok((start, end))
    }

    /// Every date of `start..=end`, in order, split into consecutive windows.
    pub fn plan(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<DateWindow>> {
        if start > end {
            return Err(IngestError::InvalidRange { start, end });
        }

        let dates: Vec<NaiveDate> = start.iter_days().take_while(|date| *date <= end).collect();
        dates
            .chunks(self.batch_size)
            .map(|chunk| DateWindow::new(chunk.to_vec(), self.batch_size))
            .collect()
    }
}

impl Default for DateRangePlanner {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        assert!(matches!(
            DateRangePlanner::new(0),
            Err(IngestError::Validation(_))
        ));
    }

    #[test]
    fn test_plan_covers_range_in_order() {
        let planner = DateRangePlanner::new(100).unwrap();
        let start = date(2023, 1, 1);
        let end = date(2023, 12, 31);

        let windows = planner.plan(start, end).unwrap();

        assert_eq!(windows.len(), 4);
        assert!(windows.iter().all(|w| w.len() <= 100));
        assert_eq!(windows[3].len(), 65);

        let flattened: Vec<NaiveDate> = windows.iter().flat_map(|w| w.iter().copied()).collect();
        assert_eq!(flattened.len(), 365);
        assert_eq!(flattened.first(), Some(&start));
        assert_eq!(flattened.last(), Some(&end));
        assert!(flattened.windows(2).all(|pair| pair[1] == pair[0].succ_opt().unwrap()));
    }

    #[test]
    fn test_plan_leap_year_and_single_day() {
        let planner = DateRangePlanner::new(7).unwrap();

        let days: usize = planner
            .plan(date(2024, 2, 1), date(2024, 3, 1))
            .unwrap()
            .iter()
            .map(|w| w.len())
            .sum();
        assert_eq!(days, 30);

        let single = planner.plan(date(2024, 5, 5), date(2024, 5, 5)).unwrap();
        assert_eq!(single.len(), 1);
        assert_eq!(single[0].dates(), &[date(2024, 5, 5)]);
    }

    #[test]
    fn test_inverted_range_is_rejected() {
        let planner = DateRangePlanner::default();
        let result = planner.plan(date(2024, 1, 2), date(2024, 1, 1));
        assert!(matches!(result, Err(IngestError::InvalidRange { .. })));

        let request = RangeRequest {
            start: Some(date(2024, 1, 2)),
            end: Some(date(2024, 1, 1)),
            resume: false,
        };
        assert!(matches!(
            planner.resolve(request, None, date(2024, 6, 1)),
            Err(IngestError::InvalidRange { .. })
        ));
    }

    #[test]
    fn test_default_range_is_yesterday_to_today() {
        let planner = DateRangePlanner::default();
        let today = date(2024, 3, 1);

        let range = planner.resolve(RangeRequest::default(), None, today).unwrap();
        assert_eq!(range, (date(2024, 2, 29), today));
    }

    #[test]
    fn test_resume_starts_after_last_ingested() {
        let planner = DateRangePlanner::default();
        let today = date(2024, 3, 10);
        let request = RangeRequest {
            resume: true,
            ..Default::default()
        };

        let range = planner
            .resolve(request, Some(date(2024, 3, 4)), today)
            .unwrap();
        assert_eq!(range, (date(2024, 3, 5), today));

        // Empty table: nothing to resume from.
        let range = planner.resolve(request, None, today).unwrap();
        assert_eq!(range, (date(2024, 3, 9), today));

        // Already caught up.
        assert!(matches!(
            planner.resolve(request, Some(today), today),
            Err(IngestError::InvalidRange { .. })
        ));
    }

    #[test]
    fn test_explicit_start_wins_over_resume() {
        let planner = DateRangePlanner::default();
        let request = RangeRequest {
            start: Some(date(2024, 1, 1)),
            end: Some(date(2024, 1, 31)),
            resume: true,
        };

        let range = planner
            .resolve(request, Some(date(2024, 1, 20)), date(2024, 6, 1))
            .unwrap();
        assert_eq!(range, (date(2024, 1, 1), date(2024, 1, 31)));
    }
}
