use crate::error::{IngestError, Result};
use crate::models::{CommitReceipt, UploadBatch};
use crate::writers::Warehouse;
use std::sync::Arc;
use tracing::{error, info};

/// Hands one batch at a time to the warehouse and waits for the commit
/// before returning. The write itself runs on the blocking pool.
pub struct BatchUploader<W: Warehouse + 'static> {
    warehouse: Arc<W>,
}

impl<W: Warehouse + 'static> BatchUploader<W> {
    pub fn new(warehouse: Arc<W>) -> Self {
        Self { warehouse }
    }

    pub fn warehouse(&self) -> &Arc<W> {
        &self.warehouse
    }

    pub async fn upload(&self, batch: UploadBatch) -> Result<CommitReceipt> {
        let table = batch.table.table_name();
        let window = batch.window.clone();

        if batch.disposition != batch.table.disposition() {
            return Err(IngestError::Upload {
                table: table.to_string(),
                window,
                message: format!(
                    "{:?} is not the write disposition of {}",
                    batch.disposition, table
                ),
            });
        }

        let warehouse = Arc::clone(&self.warehouse);
        let committed = tokio::task::spawn_blocking(move || warehouse.commit(&batch))
            .await
            .map_err(IngestError::from)
            .and_then(|result| result);

        match committed {
            Ok(receipt) => {
                info!(
                    table,
                    window = %window,
                    rows = receipt.rows_written,
                    disposition = ?receipt.disposition,
                    "batch committed"
                );
                Ok(receipt)
            }
            Err(source) => {
                error!(table, window = %window, "upload failed: {}", source);
                Err(IngestError::Upload {
                    table: table.to_string(),
                    window,
                    message: source.to_string(),
                })
            }
        }
    }
}
