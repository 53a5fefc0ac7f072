/// Remote API
pub const BASE_API_URL: &str =
    "https://sedeaplicaciones.minetur.gob.es/ServiciosRESTCarburantes/PreciosCarburantes";
pub const CURRENT_PRICES_ENDPOINT: &str = "EstacionesTerrestres";
pub const REFERENCE_LISTING_PREFIX: &str = "Listados";
pub const PRICE_LIST_KEY: &str = "ListaEESSPrecio";
pub const API_DATE_FORMAT: &str = "%d-%m-%Y";

/// Fetch and batching defaults
pub const DEFAULT_MAX_CONNECTIONS: usize = 5;
pub const MAX_CONNECTIONS_LIMIT: usize = 1024;
pub const DEFAULT_BATCH_SIZE: usize = 100;
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Retry defaults
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
pub const DEFAULT_BACKOFF_FACTOR: f64 = 1.0;
pub const DEFAULT_MAX_BACKOFF_SECS: u64 = 120;
pub const DEFAULT_RETRYABLE_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

/// Warehouse layout
pub const DEFAULT_WAREHOUSE_DIR: &str = "warehouse";
pub const DEFAULT_PROJECT: &str = "default";
pub const DATE_COLUMN: &str = "date";
pub const DEFAULT_ROW_GROUP_SIZE: usize = 50_000;

/// Settings sources
pub const DEFAULT_CONFIG_FILE: &str = "fuel-ingest.toml";
pub const ENV_PREFIX: &str = "FUEL_INGEST";

/// Parquet compression options
pub const COMPRESSION_SNAPPY: &str = "snappy";
pub const COMPRESSION_GZIP: &str = "gzip";
pub const COMPRESSION_LZ4: &str = "lz4";
pub const COMPRESSION_ZSTD: &str = "zstd";
pub const COMPRESSION_NONE: &str = "none";

/// Process exit statuses
pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FATAL: u8 = 1;
pub const EXIT_USAGE: u8 = 2;
pub const EXIT_COMPLETED_WITH_GAPS: u8 = 3;
pub const EXIT_CANCELLED: u8 = 130;
