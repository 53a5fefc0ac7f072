use crate::cli::args::Cli;
use crate::cli::credentials::ServiceAccount;
use crate::config::IngestSettings;
use crate::error::{IngestError, Result};
use crate::models::TableKind;
use crate::planner::RangeRequest;
use crate::processors::{IngestPipeline, RunReport};
use crate::readers::ApiClient;
use crate::utils::constants::DEFAULT_PROJECT;
use crate::utils::{init_logging, CancelFlag};
use crate::writers::ParquetWarehouse;
use chrono::Local;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

pub async fn run(cli: Cli) -> Result<RunReport> {
    // Reject a bad table before touching the network or the warehouse.
    let table: TableKind = cli.table.parse()?;
    validate_dataset(&cli.dataset)?;

    let settings = resolve_settings(&cli)?;
    init_logging(cli.verbose, cli.log_file.as_deref())?;

    let root = warehouse_root(&cli, &settings)?;
    info!("Warehouse: {}", root.display());
    info!("Table: {} ({:?})", table.table_name(), table.disposition());

    let warehouse =
        Arc::new(ParquetWarehouse::new(&root).with_compression(&settings.warehouse.compression)?);
    let source = Arc::new(ApiClient::from_settings(&settings.api)?);

    let cancel = CancelFlag::new();
    cancel.install_ctrl_c_handler();

    let pipeline = IngestPipeline::new(source, Arc::clone(&warehouse))
        .with_settings(&settings)?
        .with_cancel_flag(cancel)
        .with_progress(!cli.no_progress);

    let request = RangeRequest {
        start: cli.start_date,
        end: cli.end_date,
        resume: cli.resume,
    };
    let report = pipeline
        .run(table, request, Local::now().date_naive())
        .await?;

    println!("\n{}", report.summary());
    match warehouse.table_info(table) {
        Ok(info) => println!("{}", info.summary()),
        Err(e) => warn!("Could not read table statistics: {}", e),
    }

    Ok(report)
}

/// Settings from file and environment with CLI flags applied on top.
pub fn resolve_settings(cli: &Cli) -> Result<IngestSettings> {
    let mut settings = IngestSettings::load(cli.config.as_deref())?;

    if let Some(max_connections) = cli.max_connections {
        settings.fetch.max_connections = max_connections;
    }
    if let Some(batch_size) = cli.batch_size {
        settings.fetch.batch_size = batch_size;
    }
    if let Some(dir) = &cli.warehouse_dir {
        settings.warehouse.root_dir = dir.clone();
    }
    if let Some(compression) = &cli.compression {
        settings.warehouse.compression = compression.clone();
    }

    settings.revalidate()?;
    Ok(settings)
}

/// `<root_dir>/<project>/<dataset>`; the project comes from the service
/// account when one is given.
fn warehouse_root(cli: &Cli, settings: &IngestSettings) -> Result<PathBuf> {
    let project = match &cli.service_acc_path {
        Some(path) => {
            let account = ServiceAccount::load(path)?;
            if let Some(email) = &account.client_email {
                info!("Using service account {}", email);
            }
            account.project_id
        }
        None => DEFAULT_PROJECT.to_string(),
    };
    validate_dataset(&project)?;

    Ok(settings.warehouse.root_dir.join(project).join(&cli.dataset))
}

/// Dataset and project names become directory names.
fn validate_dataset(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(IngestError::Validation(format!(
            "'{}' is not a valid dataset or project name",
            name
        )))
    }
}
