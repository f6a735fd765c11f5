use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::app::ports::{ObjectStorePort, PutReceipt};
use crate::config::Credentials;
use crate::error::UploadError;
use crate::gateway::sigv4::sha256_hex;
use crate::types::UploadManifest;

/// Writes objects to `{root}/{bucket}/{key}`, for dry runs.
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn object_path(&self, bucket: &str, key: &str) -> PathBuf {
        self.root.join(bucket).join(key.trim_start_matches('/'))
    }
}

fn io_error(path: &Path, err: std::io::Error) -> UploadError {
    match err.kind() {
        std::io::ErrorKind::PermissionDenied => {
            UploadError::PermissionDenied(format!("{}: {err}", path.display()))
        }
        _ => UploadError::NetworkFailure(format!("{}: {err}", path.display())),
    }
}

#[async_trait]
impl ObjectStorePort for LocalObjectStore {
    async fn verify_credentials(&self, _credentials: &Credentials) -> Result<(), UploadError> {
        Ok(())
    }

    async fn put_object(
        &self,
        manifest: &UploadManifest,
        _credentials: &Credentials,
    ) -> Result<PutReceipt, UploadError> {
        let path = self.object_path(&manifest.bucket, &manifest.key);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).await.map_err(|e| io_error(dir, e))?;
        }

        // write then rename so readers never see a half-written object
        let tmp = path.with_extension("part");
        fs::write(&tmp, &manifest.content)
            .await
            .map_err(|e| io_error(&tmp, e))?;
        fs::rename(&tmp, &path).await.map_err(|e| io_error(&path, e))?;

        Ok(PutReceipt {
            etag: Some(sha256_hex(&manifest.content)),
        })
    }
}
