pub mod batch;
pub mod date_window;
pub mod records;
pub mod snapshot;
pub mod table;

pub use batch::{CommitReceipt, UploadBatch, WriteDisposition};
pub use date_window::DateWindow;
pub use records::{CanonicalRows, FuelPrices, FuelType, ReferenceRecord, StationPriceRecord};
pub use snapshot::{DailySnapshot, FetchedDay};
pub use table::{validate_registry, TableConfig, TableKind};
