pub mod normalizer;
pub mod pipeline;
pub mod run_report;

pub use normalizer::{ResponseNormalizer, WindowRows};
pub use pipeline::IngestPipeline;
pub use run_report::{DateFailure, FailureKind, FailureLog, RunReport};
