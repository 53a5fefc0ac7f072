use chrono::NaiveDate;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, IngestError>;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Invalid date range: start {start} is after end {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("Transient HTTP failure for {url}: {reason}")]
    TransientHttp { url: String, reason: String },

    #[error("HTTP {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Giving up after {attempts} attempts: {source}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: Box<IngestError>,
    },

    #[error("Fetch failed for {date}: {source}")]
    Fetch {
        date: NaiveDate,
        #[source]
        source: Box<IngestError>,
    },

    #[error("Schema mismatch in {table} payload: {message}")]
    SchemaMismatch { table: String, message: String },

    #[error("Upload to {table} failed for {window}: {message}")]
    Upload {
        table: String,
        window: String,
        message: String,
    },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Settings validation error: {0}")]
    Settings(#[from] validator::ValidationErrors),

    #[error("Date parsing error: {0}")]
    DateParse(#[from] chrono::ParseError),

    #[error("Run cancelled by user")]
    Cancelled,

    #[error("Async task error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

impl IngestError {
    /// Errors raised before any I/O because the request itself is unusable.
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            IngestError::Validation(_)
                | IngestError::InvalidRange { .. }
                | IngestError::DateParse(_)
                | IngestError::Settings(_)
        )
    }
}
