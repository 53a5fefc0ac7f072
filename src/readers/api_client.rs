use crate::config::ApiSettings;
use crate::error::{IngestError, Result};
use crate::models::{DailySnapshot, TableKind};
use crate::utils::constants::{API_DATE_FORMAT, CURRENT_PRICES_ENDPOINT, REFERENCE_LISTING_PREFIX};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Read-only access to the price API. Every method makes exactly one
/// attempt; retrying is the caller's business.
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Today's listing.
    async fn fetch_current(&self) -> Result<DailySnapshot>;

    /// Listing of a past day.
    async fn fetch_historical(&self, date: NaiveDate) -> Result<DailySnapshot>;

    /// Full listing of a reference table as raw JSON objects.
    async fn fetch_reference(&self, table: TableKind) -> Result<Vec<Value>>;
}

/// `reqwest` backed [`PriceSource`].
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_settings(settings: &ApiSettings) -> Result<Self> {
        Self::new(&settings.base_url, Duration::from_secs(settings.timeout_secs))
    }

    pub fn current_url(&self) -> String {
        format!("{}/{}", self.base_url, CURRENT_PRICES_ENDPOINT)
    }

    pub fn historical_url(&self, date: NaiveDate) -> String {
        format!(
            "{}/{}/{}",
            self.base_url,
            TableKind::GasPrices.config().endpoint,
            date.format(API_DATE_FORMAT)
        )
    }

    pub fn reference_url(&self, table: TableKind) -> String {
        format!(
            "{}/{}/{}/",
            self.base_url,
            REFERENCE_LISTING_PREFIX,
            table.config().endpoint
        )
    }

    /// GET `url` and return the body of a 2xx response.
    async fn get_text(&self, url: &str) -> Result<String> {
        debug!(%url, "GET");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| classify_transport_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(IngestError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response
            .text()
            .await
            .map_err(|e| classify_transport_error(url, e))
    }
}

/// Timeouts and connection problems are worth another attempt; anything
/// else from the transport is not.
fn classify_transport_error(url: &str, error: reqwest::Error) -> IngestError {
    if error.is_timeout() || error.is_connect() || error.is_body() {
        IngestError::TransientHttp {
            url: url.to_string(),
            reason: error.to_string(),
        }
    } else {
        IngestError::Http(error)
    }
}

#[async_trait]
impl PriceSource for ApiClient {
    async fn fetch_current(&self) -> Result<DailySnapshot> {
        let body = self.get_text(&self.current_url()).await?;
        DailySnapshot::from_body(&body)
    }

    async fn fetch_historical(&self, date: NaiveDate) -> Result<DailySnapshot> {
        let body = self.get_text(&self.historical_url(date)).await?;
        DailySnapshot::from_body(&body)
    }

    async fn fetch_reference(&self, table: TableKind) -> Result<Vec<Value>> {
        if !table.is_reference() {
            return Err(IngestError::Validation(format!(
                "{} is not a reference table",
                table
            )));
        }

        let url = self.reference_url(table);
        let body = self.get_text(&url).await?;
        if body.trim().is_empty() {
            return Ok(Vec::new());
        }

        match serde_json::from_str::<Value>(&body)? {
            Value::Array(records) => Ok(records),
            Value::Null => Ok(Vec::new()),
            other => Err(IngestError::SchemaMismatch {
                table: table.to_string(),
                message: format!(
                    "expected a JSON array from {}, got {}",
                    url,
                    json_kind(&other)
                ),
            }),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
