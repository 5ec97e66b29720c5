//! Shared remote services for a batch

use crate::auth::{describe_expiry, TokenSource};
use crate::drive::GoogleDrive;
use crate::sheets::GoogleSheets;
use crate::store::{ObjectStore, TabularStore};
use pagetrack_core::{PagetrackError, Result};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

const HTTP_TIMEOUT: Duration = Duration::from_secs(120);

/// Authenticated object and tabular stores, built once per batch
#[derive(Clone)]
pub struct RemoteContext {
    pub objects: Arc<dyn ObjectStore>,
    pub tables: Arc<dyn TabularStore>,
    /// Spreadsheet holding both the job list and the log sheets
    pub spreadsheet_id: String,
}

impl RemoteContext {
    pub fn new(objects: Arc<dyn ObjectStore>, tables: Arc<dyn TabularStore>, spreadsheet_id: impl Into<String>) -> Self {
        Self {
            objects,
            tables,
            spreadsheet_id: spreadsheet_id.into(),
        }
    }

    /// Authenticate and connect to Drive and Sheets
    pub async fn connect_google(token_file: &Path, spreadsheet_id: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| PagetrackError::remote(format!("Failed to build HTTP client: {}", e)))?;
        let tokens = Arc::new(TokenSource::connect(http.clone(), token_file).await?);
        tracing::info!(
            "Google Drive and Sheets services ready; token {}",
            describe_expiry(tokens.expiry().await, chrono::Utc::now())
        );

        Ok(Self::new(
            Arc::new(GoogleDrive::new(http.clone(), tokens.clone())),
            Arc::new(GoogleSheets::new(http, tokens)),
            spreadsheet_id,
        ))
    }
}

impl std::fmt::Debug for RemoteContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteContext")
            .field("spreadsheet_id", &self.spreadsheet_id)
            .finish_non_exhaustive()
    }
}
