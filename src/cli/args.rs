use clap::Parser;
use chrono::NaiveDate;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "fuel-ingest")]
#[command(about = "Load Spanish fuel station prices and reference listings into a Parquet warehouse")]
#[command(version)]
pub struct Cli {
    #[arg(long, help = "Warehouse dataset the table lives in")]
    pub dataset: String,

    #[arg(
        long,
        help = "Table to ingest: gas_prices, regions, provinces or municipalities"
    )]
    pub table: String,

    #[arg(
        long = "start_date",
        conflicts_with = "resume",
        help = "First date to ingest, YYYY-MM-DD [default: yesterday]"
    )]
    pub start_date: Option<NaiveDate>,

    #[arg(long = "end_date", help = "Last date to ingest, YYYY-MM-DD [default: today]")]
    pub end_date: Option<NaiveDate>,

    #[arg(long, help = "Start the day after the latest date already in the warehouse")]
    pub resume: bool,

    #[arg(long = "max_connections", help = "Concurrent API requests [default: 5]")]
    pub max_connections: Option<usize>,

    #[arg(long = "batch_size", help = "Days per upload window [default: 100]")]
    pub batch_size: Option<usize>,

    #[arg(long = "service_acc_path", help = "Service account JSON naming the warehouse project")]
    pub service_acc_path: Option<PathBuf>,

    #[arg(long = "warehouse_dir", help = "Warehouse root directory [default: warehouse]")]
    pub warehouse_dir: Option<PathBuf>,

    #[arg(long, help = "Settings file [default: fuel-ingest.toml if present]")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Parquet compression: snappy, gzip, lz4, zstd or none")]
    pub compression: Option<String>,

    #[arg(short, long, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(long = "log_file", help = "Log file path")]
    pub log_file: Option<PathBuf>,

    #[arg(long = "no_progress", help = "Disable progress bars")]
    pub no_progress: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_underscore_flags() {
        let cli = Cli::try_parse_from([
            "fuel-ingest",
            "--dataset",
            "fuel",
            "--table",
            "gas_prices",
            "--start_date",
            "2024-01-01",
            "--end_date",
            "2024-01-31",
            "--max_connections",
            "8",
            "--batch_size",
            "10",
        ])
        .unwrap();

        assert_eq!(cli.dataset, "fuel");
        assert_eq!(cli.start_date, NaiveDate::from_ymd_opt(2024, 1, 1));
        assert_eq!(cli.end_date, NaiveDate::from_ymd_opt(2024, 1, 31));
        assert_eq!(cli.max_connections, Some(8));
        assert_eq!(cli.batch_size, Some(10));
        assert!(!cli.resume);
    }

    #[test]
    fn test_table_is_not_checked_by_clap() {
        let cli = Cli::try_parse_from(["fuel-ingest", "--dataset", "d", "--table", "stations"]);
        assert!(cli.is_ok());
    }

    #[test]
    fn test_start_date_conflicts_with_resume() {
        let cli = Cli::try_parse_from([
            "fuel-ingest",
            "--dataset",
            "d",
            "--table",
            "gas_prices",
            "--resume",
            "--start_date",
            "2024-01-01",
        ]);
        assert!(cli.is_err());
    }

    #[test]
    fn test_malformed_date_rejected() {
        let cli = Cli::try_parse_from([
            "fuel-ingest",
            "--dataset",
            "d",
            "--table",
            "gas_prices",
            "--start_date",
            "01-01-2024",
        ]);
        assert!(cli.is_err());
    }
}
