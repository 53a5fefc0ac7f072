use clap::Parser;
use fuel_price_ingest::cli::{run, Cli};
use fuel_price_ingest::error::IngestError;
use fuel_price_ingest::utils::constants::{EXIT_CANCELLED, EXIT_FATAL, EXIT_USAGE};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(report) => ExitCode::from(report.exit_code()),
        Err(error) => {
            eprintln!("Error: {}", error);
            if error.is_usage_error() {
                ExitCode::from(EXIT_USAGE)
            } else if matches!(error, IngestError::Cancelled) {
                ExitCode::from(EXIT_CANCELLED)
            } else {
                ExitCode::from(EXIT_FATAL)
            }
        }
    }
}
