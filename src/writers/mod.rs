pub mod batch_uploader;
pub mod warehouse;

pub use batch_uploader::BatchUploader;
pub use warehouse::{ParquetWarehouse, TableInfo, Warehouse};
