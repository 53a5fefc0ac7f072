use crate::error::{IngestError, Result};
use crate::utils::constants::*;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ApiSettings {
    #[validate(length(min = 1))]
    pub base_url: String,

    #[validate(range(min = 1))]
    pub timeout_secs: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: BASE_API_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct RetrySettings {
    #[validate(range(min = 1))]
    pub max_attempts: u32,

    #[validate(range(min = 0.0))]
    pub backoff_factor: f64,

    pub max_backoff_secs: u64,

    pub retryable_statuses: Vec<u16>,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_factor: DEFAULT_BACKOFF_FACTOR,
            max_backoff_secs: DEFAULT_MAX_BACKOFF_SECS,
            retryable_statuses: DEFAULT_RETRYABLE_STATUSES.to_vec(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct FetchSettings {
    #[validate(range(min = 1, max = MAX_CONNECTIONS_LIMIT))]
    pub max_connections: usize,

    #[validate(range(min = 1))]
    pub batch_size: usize,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct WarehouseSettings {
    pub root_dir: PathBuf,

    #[validate(length(min = 1))]
    pub compression: String,
}

impl Default for WarehouseSettings {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from(DEFAULT_WAREHOUSE_DIR),
            compression: COMPRESSION_SNAPPY.to_string(),
        }
    }
}

/// Run settings layered from defaults, an optional TOML file and
/// `FUEL_INGEST__SECTION__KEY` environment variables. CLI flags are applied
/// on top by the caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct IngestSettings {
    #[validate(nested)]
    pub api: ApiSettings,

    #[validate(nested)]
    pub retry: RetrySettings,

    #[validate(nested)]
    pub fetch: FetchSettings,

    #[validate(nested)]
    pub warehouse: WarehouseSettings,
}

impl IngestSettings {
    /// Load settings. An explicitly given file must exist; the default
    /// `fuel-ingest.toml` is optional.
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        let file_source = match config_file {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let settings: IngestSettings = Config::builder()
            .add_source(file_source)
            // e.g. FUEL_INGEST__FETCH__MAX_CONNECTIONS=8
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    /// Re-check invariants after CLI overrides have been applied.
    pub fn revalidate(&self) -> Result<()> {
        self.validate().map_err(IngestError::from)
    }
}
