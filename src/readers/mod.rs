pub mod api_client;
pub mod concurrent_fetcher;
pub mod retry;

pub use api_client::{ApiClient, PriceSource};
pub use concurrent_fetcher::ConcurrentFetcher;
pub use retry::RetryPolicy;
