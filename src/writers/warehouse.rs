use crate::error::{IngestError, Result};
use crate::models::{CanonicalRows, CommitReceipt, TableKind, UploadBatch, WriteDisposition};
use crate::utils::constants::{
    COMPRESSION_GZIP, COMPRESSION_LZ4, COMPRESSION_NONE, COMPRESSION_SNAPPY, COMPRESSION_ZSTD,
    DATE_COLUMN, DEFAULT_ROW_GROUP_SIZE,
};
use crate::utils::{parse_part_sequence, part_file_name, temp_part_file_name};
use arrow::array::{Array, ArrayRef, Date32Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::NaiveDate;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::{ArrowWriter, ProjectionMask};
use parquet::basic::{Compression, GzipLevel, ZstdLevel};
use parquet::file::properties::WriterProperties;
use parquet::file::reader::{FileReader, SerializedFileReader};
use std::fs::{self, File};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

/// Days between 0001-01-01 and 1970-01-01, the Date32 epoch.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Destination of canonical rows. A successful `commit` means the rows are
/// durable and visible to later reads.
pub trait Warehouse: Send + Sync {
    fn commit(&self, batch: &UploadBatch) -> Result<CommitReceipt>;

    /// Latest `date` present in a dated table, `None` when the table is
    /// empty, absent or undated.
    fn max_date(&self, table: TableKind) -> Result<Option<NaiveDate>>;

    fn row_count(&self, table: TableKind) -> Result<u64>;
}

/// Local columnar warehouse: one directory per table holding numbered
/// Parquet part files.
///
/// ```text
/// <root>/raw_gas_prices/part-000001.parquet
/// <root>/raw_gas_prices/part-000002.parquet
/// <root>/raw_regions/part-000004.parquet
/// ```
///
/// Parts are written under a temporary name, synced and renamed into place,
/// so a reader never sees a half-written part. For a REPLACE table only the
/// highest-numbered part is live: renaming it into place is the commit, and
/// older parts are removed afterwards on a best-effort basis.
pub struct ParquetWarehouse {
    root: PathBuf,
    compression: Compression,
    row_group_size: usize,
}

impl ParquetWarehouse {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            compression: Compression::SNAPPY,
            row_group_size: DEFAULT_ROW_GROUP_SIZE,
        }
    }

    pub fn with_compression(mut self, compression: &str) -> Result<Self> {
        self.compression = match compression.to_lowercase().as_str() {
            COMPRESSION_SNAPPY => Compression::SNAPPY,
            COMPRESSION_GZIP => Compression::GZIP(GzipLevel::default()),
            COMPRESSION_LZ4 => Compression::LZ4,
            COMPRESSION_ZSTD => Compression::ZSTD(ZstdLevel::default()),
            COMPRESSION_NONE => Compression::UNCOMPRESSED,
            _ => {
                return Err(IngestError::Validation(format!(
                    "Unsupported compression: {}",
                    compression
                )))
            }
        };
        Ok(self)
    }

    pub fn table_dir(&self, table: TableKind) -> PathBuf {
        self.root.join(table.table_name())
    }

    /// Committed parts of a table ordered by sequence number. Temporary
    /// files left by an interrupted write are ignored.
    fn committed_parts(&self, table: TableKind) -> Result<Vec<(u64, PathBuf)>> {
        let dir = self.table_dir(table);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut parts = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if let Some(sequence) = parse_part_sequence(&path) {
                parts.push((sequence, path));
            }
        }
        parts.sort_by_key(|(sequence, _)| *sequence);
        Ok(parts)
    }

    /// Parts whose rows belong to the table. A REPLACE table is its latest
    /// part alone; leftovers of an interrupted cleanup are not read.
    fn live_parts(&self, table: TableKind) -> Result<Vec<(u64, PathBuf)>> {
        let mut parts = self.committed_parts(table)?;
        if table.disposition() == WriteDisposition::Replace && parts.len() > 1 {
            parts.drain(..parts.len() - 1);
        }
        Ok(parts)
    }

    /// Arrow schema of a table: `date` first for the fact table, then every
    /// canonical text column as nullable UTF-8.
    pub fn schema(table: TableKind) -> Arc<Schema> {
        let mut fields = Vec::new();
        if !table.is_reference() {
            fields.push(Field::new(DATE_COLUMN, DataType::Date32, false));
        }
        fields.extend(
            table
                .text_columns()
                .into_iter()
                .map(|column| Field::new(column, DataType::Utf8, true)),
        );
        Arc::new(Schema::new(fields))
    }

    fn rows_to_batch(&self, batch: &UploadBatch, schema: Arc<Schema>) -> Result<RecordBatch> {
        let mut columns: Vec<ArrayRef> = Vec::with_capacity(schema.fields().len());

        let values: Vec<Vec<Option<&str>>> = match (&batch.rows, batch.table.is_reference()) {
            (CanonicalRows::Prices(rows), false) => {
                let dates: Vec<i32> = rows.iter().map(|r| date_to_days(r.date)).collect();
                columns.push(Arc::new(Date32Array::from(dates)));
                rows.iter().map(|r| r.text_values()).collect()
            }
            (CanonicalRows::Reference(rows), true) => {
                let has_parent = batch.table.parent_column().is_some();
                rows.iter().map(|r| r.text_values(has_parent)).collect()
            }
            _ => {
                return Err(IngestError::Validation(format!(
                    "rows of window {} do not belong to {}",
                    batch.window,
                    batch.table.table_name()
                )))
            }
        };

        let text_columns = batch.table.text_columns().len();
        for index in 0..text_columns {
            let column: StringArray = values.iter().map(|row| row[index]).collect();
            columns.push(Arc::new(column));
        }

        Ok(RecordBatch::try_new(schema, columns)?)
    }

    /// Write one part under its temporary name, fsync it and move it into
    /// place.
    fn write_part(&self, batch: &UploadBatch, sequence: u64) -> Result<PathBuf> {
        let dir = self.table_dir(batch.table);
        fs::create_dir_all(&dir)?;

        let schema = Self::schema(batch.table);
        let record_batch = self.rows_to_batch(batch, schema.clone())?;

        let temp_path = dir.join(temp_part_file_name(sequence));
        let final_path = dir.join(part_file_name(sequence));

        let file = File::create(&temp_path)?;
        let props = WriterProperties::builder()
            .set_compression(self.compression)
            .set_max_row_group_size(self.row_group_size)
            .build();

        let written = (|| -> Result<()> {
            let mut writer = ArrowWriter::try_new(file.try_clone()?, schema, Some(props))?;
            if record_batch.num_rows() > 0 {
                writer.write(&record_batch)?;
            }
            writer.close()?;
            file.sync_all()?;
            Ok(())
        })();

        if let Err(error) = written {
            if let Err(cleanup) = fs::remove_file(&temp_path) {
                warn!("could not remove {}: {}", temp_path.display(), cleanup);
            }
            return Err(error);
        }

        fs::rename(&temp_path, &final_path)?;
        sync_dir(&dir)?;
        Ok(final_path)
    }

    /// Values of one text column across all committed parts, in part order.
    pub fn read_text_column(&self, table: TableKind, column: &str) -> Result<Vec<Option<String>>> {
        let mut values = Vec::new();

        for (_, path) in self.live_parts(table)? {
            let reader = ParquetRecordBatchReaderBuilder::try_new(File::open(&path)?)?.build()?;
            for batch in reader {
                let batch = batch?;
                let array = batch
                    .column_by_name(column)
                    .and_then(|array| array.as_any().downcast_ref::<StringArray>())
                    .ok_or_else(|| IngestError::SchemaMismatch {
                        table: table.table_name().to_string(),
                        message: format!("{} has no text column '{}'", path.display(), column),
                    })?;
                values.extend(array.iter().map(|value| value.map(str::to_string)));
            }
        }

        Ok(values)
    }

    /// Per-table statistics for the run summary.
    pub fn table_info(&self, table: TableKind) -> Result<TableInfo> {
        let parts = self.live_parts(table)?;
        let mut info = TableInfo {
            table: table.table_name(),
            parts: parts.len(),
            total_rows: 0,
            total_bytes: 0,
        };

        for (_, path) in &parts {
            let reader = SerializedFileReader::new(File::open(path)?)?;
            info.total_rows += reader.metadata().file_metadata().num_rows().max(0) as u64;
            info.total_bytes += fs::metadata(path)?.len();
        }

        Ok(info)
    }
}

impl Warehouse for ParquetWarehouse {
    fn commit(&self, batch: &UploadBatch) -> Result<CommitReceipt> {
        let table_name = batch.table.table_name();

        if batch.is_empty() && batch.disposition == WriteDisposition::Append {
            debug!(table = table_name, window = %batch.window, "nothing to append");
            return Ok(CommitReceipt {
                table: table_name.to_string(),
                disposition: batch.disposition,
                rows_written: 0,
                part: None,
            });
        }
        if batch.is_empty() {
            warn!(table = table_name, "replacing table with an empty listing");
        }

        let previous = self.committed_parts(batch.table)?;
        let sequence = previous.last().map_or(1, |(sequence, _)| sequence + 1);
        let part = self.write_part(batch, sequence)?;

        // The new part is live from here on; stale parts are only clutter.
        if batch.disposition == WriteDisposition::Replace {
            for (_, stale) in previous {
                if let Err(e) = fs::remove_file(&stale) {
                    warn!("could not remove replaced part {}: {}", stale.display(), e);
                }
            }
        }

        debug!(
            table = table_name,
            rows = batch.len(),
            part = %part.display(),
            "part committed"
        );

        Ok(CommitReceipt {
            table: table_name.to_string(),
            disposition: batch.disposition,
            rows_written: batch.len(),
            part: Some(part),
        })
    }

    fn max_date(&self, table: TableKind) -> Result<Option<NaiveDate>> {
        if table.is_reference() {
            return Ok(None);
        }

        let mut latest: Option<i32> = None;
        for (_, path) in self.live_parts(table)? {
            let builder = ParquetRecordBatchReaderBuilder::try_new(File::open(&path)?)?;
            let mask = ProjectionMask::roots(builder.parquet_schema(), [0]);
            let reader = builder.with_projection(mask).build()?;

            for batch in reader {
                let batch = batch?;
                let dates = batch
                    .column_by_name(DATE_COLUMN)
                    .and_then(|array| array.as_any().downcast_ref::<Date32Array>())
                    .ok_or_else(|| IngestError::SchemaMismatch {
                        table: table.table_name().to_string(),
                        message: format!("{} has no Date32 '{}' column", path.display(), DATE_COLUMN),
                    })?;
                latest = latest.max(dates.iter().flatten().max());
            }
        }

        Ok(latest.and_then(days_to_date))
    }

    fn row_count(&self, table: TableKind) -> Result<u64> {
        Ok(self.table_info(table)?.total_rows)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableInfo {
    pub table: &'static str,
    pub parts: usize,
    pub total_rows: u64,
    pub total_bytes: u64,
}

impl TableInfo {
    pub fn summary(&self) -> String {
        format!(
            "{}: {} rows in {} parts ({:.2} MB)",
            self.table,
            self.total_rows,
            self.parts,
            self.total_bytes as f64 / 1_048_576.0
        )
    }
}

/// Make a rename inside `dir` durable.
#[cfg(unix)]
fn sync_dir(dir: &std::path::Path) -> Result<()> {
    File::open(dir)?.sync_all()?;
    Ok(())
}

#[cfg(not(unix))]
fn sync_dir(_dir: &std::path::Path) -> Result<()> {
    Ok(())
}

fn date_to_days(date: NaiveDate) -> i32 {
    use chrono::Datelike;
    date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE
}

fn days_to_date(days: i32) -> Option<NaiveDate> {
    NaiveDate::from_num_days_from_ce_opt(days + UNIX_EPOCH_DAYS_FROM_CE)
}
