use crate::error::{IngestError, Result};
use serde::Deserialize;
use std::path::Path;

/// The parts of a service account file the loader needs.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccount {
    pub project_id: String,
    #[serde(default)]
    pub client_email: Option<String>,
}

impl ServiceAccount {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            IngestError::Validation(format!(
                "Cannot read service account file {}: {}",
                path.display(),
                e
            ))
        })?;

        let account: ServiceAccount = serde_json::from_str(&content).map_err(|e| {
            IngestError::Validation(format!(
                "Malformed service account file {}: {}",
                path.display(),
                e
            ))
        })?;

        if account.project_id.trim().is_empty() {
            return Err(IngestError::Validation(format!(
                "Service account file {} has an empty project_id",
                path.display()
            )));
        }

        Ok(account)
    }
}
