use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::app::ports::ObjectStorePort;
use crate::config::Credentials;
use crate::constants::CSV_CONTENT_TYPE;
use crate::error::UploadError;
use crate::pipeline::dataset::Dataset;
use crate::types::UploadManifest;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadResult {
    pub bucket: String,
    pub key: String,
    pub bytes: usize,
    pub records: usize,
    pub invalid_records: usize,
    pub etag: Option<String>,
}

/// Serializes a dataset to CSV and puts it in one request.
pub struct StorageUploader {
    store: Arc<dyn ObjectStorePort>,
}

impl StorageUploader {
    pub fn new(store: Arc<dyn ObjectStorePort>) -> Self {
        Self { store }
    }

    /// Verifies credentials first; on failure nothing is written.
    /// No retries here: the caller decides whether to run again.
    #[instrument(level = "info", skip(self, dataset, credentials), fields(records = dataset.len()))]
    pub async fn upload(
        &self,
        dataset: &Dataset,
        bucket: &str,
        key: &str,
        credentials: &Credentials,
    ) -> Result<UploadResult, UploadError> {
        if let Err(e) = self.store.verify_credentials(credentials).await {
            warn!(error = %e, "Credential check failed, skipping upload");
            return Err(e);
        }

        let manifest = UploadManifest {
            bucket: bucket.to_string(),
            key: key.to_string(),
            content: dataset.to_csv()?,
            content_type: CSV_CONTENT_TYPE,
        };
        let bytes = manifest.content.len();
        let receipt = self.store.put_object(&manifest, credentials).await?;

        info!(bucket, key, bytes, "File saved to storage");
        Ok(UploadResult {
            bucket: manifest.bucket,
            key: manifest.key,
            bytes,
            records: dataset.len(),
            invalid_records: dataset.invalid_count(),
            etag: receipt.etag,
        })
    }
}
