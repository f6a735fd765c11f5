use async_trait::async_trait;
use std::time::Duration;

use crate::config::Credentials;
use crate::error::{FetchError, UploadError};
use crate::types::UploadManifest;

// Fetch-side port
#[async_trait]
pub trait HttpClientPort: Send + Sync {
    /// One GET attempt. Transport failures are classified as `Timeout` or
    /// `ConnectionFailed`; HTTP statuses are returned as-is in the result.
    async fn get(&self, url: &str, timeout: Duration) -> Result<HttpGetResult, FetchError>;
}

#[derive(Clone, Debug)]
pub struct HttpGetResult {
    pub status: u16,
    pub bytes: Vec<u8>,
    pub final_url: String,
    pub content_type: String,
}

// Storage-side port
#[async_trait]
pub trait ObjectStorePort: Send + Sync {
    /// Checks the credentials against the provider's identity endpoint.
    async fn verify_credentials(&self, credentials: &Credentials) -> Result<(), UploadError>;

    /// Writes the whole payload in one request, replacing any existing object.
    async fn put_object(
        &self,
        manifest: &UploadManifest,
        credentials: &Credentials,
    ) -> Result<PutReceipt, UploadError>;
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PutReceipt {
    pub etag: Option<String>,
}
