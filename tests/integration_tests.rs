use async_trait::async_trait;
use chrono::NaiveDate;
use clap::Parser;
use fuel_price_ingest::cli::{run, Cli};
use fuel_price_ingest::error::{IngestError, Result};
use fuel_price_ingest::models::{CommitReceipt, DailySnapshot, TableKind, UploadBatch};
use fuel_price_ingest::planner::RangeRequest;
use fuel_price_ingest::processors::{FailureKind, IngestPipeline};
use fuel_price_ingest::readers::{PriceSource, RetryPolicy};
use fuel_price_ingest::utils::constants::{EXIT_CANCELLED, EXIT_COMPLETED_WITH_GAPS, EXIT_SUCCESS};
use fuel_price_ingest::utils::CancelFlag;
use fuel_price_ingest::writers::{ParquetWarehouse, Warehouse};
use pretty_assertions::assert_eq;
use serde_json::{json, Map, Value};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
}

fn station(id: usize, diesel: &str) -> Value {
    let mut object = Map::new();
    for (raw, _) in TableKind::GasPrices.config().columns {
        object.insert(raw.to_string(), json!(""));
    }
    object.insert("IDEESS".to_string(), json!(id.to_string()));
    object.insert("Rótulo".to_string(), json!("BALLENOIL"));
    object.insert("Precio Gasoleo A".to_string(), json!(diesel));
    Value::Object(object)
}

/// Serves `stations[date]` records per day; dates missing from the map
/// come back empty, `broken` dates fail with HTTP 500.
#[derive(Default)]
struct FakeApi {
    stations: HashMap<NaiveDate, usize>,
    broken: HashSet<NaiveDate>,
    today: Option<NaiveDate>,
    calls: AtomicUsize,
    requested: Mutex<Vec<NaiveDate>>,
}

impl FakeApi {
    fn with_days(days: &[(NaiveDate, usize)]) -> Self {
        Self {
            stations: days.iter().copied().collect(),
            ..Default::default()
        }
    }

    fn requested(&self) -> Vec<NaiveDate> {
        let mut dates = self.requested.lock().unwrap().clone();
        dates.sort();
        dates.dedup();
        dates
    }

    fn serve(&self, date: NaiveDate) -> Result<DailySnapshot> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requested.lock().unwrap().push(date);

        if self.broken.contains(&date) {
            return Err(IngestError::HttpStatus {
                url: format!("fake/{}", date),
                status: 500,
            });
        }
        let count = self.stations.get(&date).copied().unwrap_or(0);
        let records: Vec<Value> = (0..count).map(|i| station(i, "1,479")).collect();
        Ok(DailySnapshot::from_value(json!({ "ListaEESSPrecio": records })))
    }
}

#[async_trait]
impl PriceSource for FakeApi {
    async fn fetch_current(&self) -> Result<DailySnapshot> {
        let today = self.today.expect("current endpoint not expected");
        self.serve(today)
    }

    async fn fetch_historical(&self, date: NaiveDate) -> Result<DailySnapshot> {
        self.serve(date)
    }

    async fn fetch_reference(&self, table: TableKind) -> Result<Vec<Value>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match table {
            TableKind::Regions => Ok(vec![
                json!({"IDCCAA": "01", "CCAA": "Andalucía"}),
                json!({"IDCCAA": "02", "CCAA": "Aragón"}),
                json!({"IDCCAA": "03", "CCAA": "Asturias, Principado de"}),
            ]),
            other => Err(IngestError::Validation(format!("no fixture for {}", other))),
        }
    }
}

/// Delegates to a real warehouse but refuses the `fail_on`-th commit.
struct FlakyWarehouse {
    inner: ParquetWarehouse,
    commits: AtomicUsize,
    fail_on: usize,
}

impl Warehouse for FlakyWarehouse {
    fn commit(&self, batch: &UploadBatch) -> Result<CommitReceipt> {
        let n = self.commits.fetch_add(1, Ordering::SeqCst) + 1;
        if n == self.fail_on {
            return Err(IngestError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "quota exceeded",
            )));
        }
        self.inner.commit(batch)
    }

    fn max_date(&self, table: TableKind) -> Result<Option<NaiveDate>> {
        self.inner.max_date(table)
    }

    fn row_count(&self, table: TableKind) -> Result<u64> {
        self.inner.row_count(table)
    }
}

fn pipeline<W: Warehouse + 'static>(
    api: Arc<FakeApi>,
    warehouse: Arc<W>,
    batch_size: usize,
) -> IngestPipeline<FakeApi, W> {
    IngestPipeline::new(api, warehouse)
        .with_batch_size(batch_size)
        .unwrap()
        .with_max_connections(3)
        .with_retry_policy(RetryPolicy::new(2).with_backoff_factor(0.0))
}

fn range(start: NaiveDate, end: NaiveDate) -> RangeRequest {
    RangeRequest {
        start: Some(start),
        end: Some(end),
        resume: false,
    }
}

#[tokio::test]
async fn test_empty_day_does_not_break_window() {
    let dir = TempDir::new().unwrap();
    let api = Arc::new(FakeApi::with_days(&[(date(1), 3), (date(3), 2)]));
    let warehouse = Arc::new(ParquetWarehouse::new(dir.path()));

    let report = pipeline(Arc::clone(&api), Arc::clone(&warehouse), 100)
        .run(TableKind::GasPrices, range(date(1), date(3)), date(20))
        .await
        .unwrap();

    assert_eq!(report.rows_written, 5);
    assert_eq!(report.dates_requested, 3);
    assert_eq!(report.dates_with_data, 2);
    assert_eq!(report.empty_dates, 1);
    assert_eq!(report.exit_code(), EXIT_SUCCESS);
    assert_eq!(warehouse.row_count(TableKind::GasPrices).unwrap(), 5);
    assert_eq!(warehouse.max_date(TableKind::GasPrices).unwrap(), Some(date(3)));
}

#[tokio::test]
async fn test_windows_commit_in_order() {
    let dir = TempDir::new().unwrap();
    let days: Vec<(NaiveDate, usize)> = (1..=10).map(|d| (date(d), 1)).collect();
    let api = Arc::new(FakeApi::with_days(&days));
    let warehouse = Arc::new(ParquetWarehouse::new(dir.path()));

    let report = pipeline(Arc::clone(&api), Arc::clone(&warehouse), 3)
        .run(TableKind::GasPrices, range(date(1), date(10)), date(20))
        .await
        .unwrap();

    assert_eq!(report.windows_planned, 4);
    assert_eq!(report.windows_committed, 4);
    assert_eq!(
        warehouse.table_info(TableKind::GasPrices).unwrap().parts,
        4
    );
    assert_eq!(api.requested(), (1..=10).map(date).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_append_rerun_duplicates_rows() {
    let dir = TempDir::new().unwrap();
    let api = Arc::new(FakeApi::with_days(&[(date(1), 4)]));
    let warehouse = Arc::new(ParquetWarehouse::new(dir.path()));
    let pipeline = pipeline(api, Arc::clone(&warehouse), 100);

    for _ in 0..2 {
        pipeline
            .run(TableKind::GasPrices, range(date(1), date(1)), date(20))
            .await
            .unwrap();
    }

    assert_eq!(warehouse.row_count(TableKind::GasPrices).unwrap(), 8);
}

#[tokio::test]
async fn test_replace_rerun_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let api = Arc::new(FakeApi::default());
    let warehouse = Arc::new(ParquetWarehouse::new(dir.path()));
    let pipeline = pipeline(api, Arc::clone(&warehouse), 100);

    let first = pipeline
        .run(TableKind::Regions, RangeRequest::default(), date(20))
        .await
        .unwrap();
    let names_after_first = warehouse
        .read_text_column(TableKind::Regions, "name")
        .unwrap();

    let second = pipeline
        .run(TableKind::Regions, RangeRequest::default(), date(20))
        .await
        .unwrap();

    assert_eq!(first.rows_written, 3);
    assert_eq!(second.rows_written, 3);
    assert_eq!(warehouse.row_count(TableKind::Regions).unwrap(), 3);
    assert_eq!(
        warehouse.read_text_column(TableKind::Regions, "name").unwrap(),
        names_after_first
    );
    assert_eq!(warehouse.table_info(TableKind::Regions).unwrap().parts, 1);
}

#[tokio::test]
async fn test_failed_upload_aborts_run() {
    let dir = TempDir::new().unwrap();
    let days: Vec<(NaiveDate, usize)> = (1..=3).map(|d| (date(d), 2)).collect();
    let api = Arc::new(FakeApi::with_days(&days));
    let warehouse = Arc::new(FlakyWarehouse {
        inner: ParquetWarehouse::new(dir.path()),
        commits: AtomicUsize::new(0),
        fail_on: 2,
    });

    let result = pipeline(Arc::clone(&api), Arc::clone(&warehouse), 1)
        .run(TableKind::GasPrices, range(date(1), date(3)), date(20))
        .await;

    match result {
        Err(IngestError::Upload { table, window, .. }) => {
            assert_eq!(table, "raw_gas_prices");
            assert_eq!(window, date(2).to_string());
        }
        other => panic!("expected upload error, got {:?}", other.map(|r| r.summary())),
    }
    // The first window stays committed and the third is never fetched.
    assert_eq!(warehouse.row_count(TableKind::GasPrices).unwrap(), 2);
    assert_eq!(api.requested(), vec![date(1), date(2)]);
}

#[tokio::test]
async fn test_failed_dates_complete_with_gaps() {
    let dir = TempDir::new().unwrap();
    let api = Arc::new(FakeApi {
        stations: [(date(1), 2), (date(2), 2), (date(3), 2)].into_iter().collect(),
        broken: HashSet::from([date(2)]),
        ..Default::default()
    });
    let warehouse = Arc::new(ParquetWarehouse::new(dir.path()));

    let report = pipeline(Arc::clone(&api), Arc::clone(&warehouse), 100)
        .run(TableKind::GasPrices, range(date(1), date(3)), date(20))
        .await
        .unwrap();

    assert_eq!(report.rows_written, 4);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].date, date(2));
    assert_eq!(report.failures[0].kind, FailureKind::Fetch);
    assert_eq!(report.exit_code(), EXIT_COMPLETED_WITH_GAPS);
    // Two attempts for the broken day, one for each of the others.
    assert_eq!(api.calls.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn test_resume_continues_after_last_date() {
    let dir = TempDir::new().unwrap();
    let days: Vec<(NaiveDate, usize)> = (1..=5).map(|d| (date(d), 1)).collect();
    let api = Arc::new(FakeApi {
        stations: days.into_iter().collect(),
        today: Some(date(5)),
        ..Default::default()
    });
    let warehouse = Arc::new(ParquetWarehouse::new(dir.path()));
    let pipeline = pipeline(Arc::clone(&api), Arc::clone(&warehouse), 100);

    pipeline
        .run(TableKind::GasPrices, range(date(1), date(3)), date(5))
        .await
        .unwrap();

    let resume = RangeRequest {
        resume: true,
        ..Default::default()
    };
    let report = pipeline
        .run(TableKind::GasPrices, resume, date(5))
        .await
        .unwrap();

    assert_eq!(report.start, Some(date(4)));
    assert_eq!(report.end, Some(date(5)));
    assert_eq!(warehouse.row_count(TableKind::GasPrices).unwrap(), 5);
    assert_eq!(warehouse.max_date(TableKind::GasPrices).unwrap(), Some(date(5)));

    // Nothing left to do.
    let caught_up = pipeline.run(TableKind::GasPrices, resume, date(5)).await;
    assert!(matches!(caught_up, Err(IngestError::InvalidRange { .. })));
}

#[tokio::test]
async fn test_inverted_range_makes_no_requests() {
    let dir = TempDir::new().unwrap();
    let api = Arc::new(FakeApi::default());
    let warehouse = Arc::new(ParquetWarehouse::new(dir.path()));

    let result = pipeline(Arc::clone(&api), warehouse, 100)
        .run(TableKind::GasPrices, range(date(5), date(1)), date(20))
        .await;

    assert!(matches!(result, Err(IngestError::InvalidRange { .. })));
    assert_eq!(api.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_cancelled_run_commits_nothing_new() {
    let dir = TempDir::new().unwrap();
    let api = Arc::new(FakeApi::with_days(&[(date(1), 1)]));
    let warehouse = Arc::new(ParquetWarehouse::new(dir.path()));
    let cancel = CancelFlag::new();
    cancel.cancel();

    let report = pipeline(Arc::clone(&api), Arc::clone(&warehouse), 100)
        .with_cancel_flag(cancel)
        .run(TableKind::GasPrices, range(date(1), date(2)), date(20))
        .await
        .unwrap();

    assert!(report.cancelled);
    assert_eq!(report.exit_code(), EXIT_CANCELLED);
    assert_eq!(report.windows_committed, 0);
    assert_eq!(api.calls.load(Ordering::SeqCst), 0);
    assert_eq!(warehouse.row_count(TableKind::GasPrices).unwrap(), 0);
}

#[tokio::test]
async fn test_cancelled_reference_run_keeps_table() {
    let dir = TempDir::new().unwrap();
    let api = Arc::new(FakeApi::default());
    let warehouse = Arc::new(ParquetWarehouse::new(dir.path()));
    let cancel = CancelFlag::new();
    cancel.cancel();

    let report = pipeline(Arc::clone(&api), Arc::clone(&warehouse), 100)
        .with_cancel_flag(cancel)
        .run(TableKind::Regions, RangeRequest::default(), date(20))
        .await
        .unwrap();

    assert!(report.cancelled);
    assert_eq!(report.exit_code(), EXIT_CANCELLED);
    assert_eq!(report.windows_committed, 0);
    assert_eq!(warehouse.row_count(TableKind::Regions).unwrap(), 0);
}

#[tokio::test]
async fn test_unsupported_table_is_usage_error() {
    let dir = TempDir::new().unwrap();
    let cli = Cli::try_parse_from([
        "fuel-ingest",
        "--dataset",
        "fuel",
        "--table",
        "stations",
        "--warehouse_dir",
        dir.path().to_str().unwrap(),
        "--no_progress",
    ])
    .unwrap();

    let error = run(cli).await.unwrap_err();

    assert!(matches!(error, IngestError::Validation(_)));
    assert!(error.is_usage_error());
    // Nothing was created on disk either.
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}
