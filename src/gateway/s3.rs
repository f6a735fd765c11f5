use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::ETAG;
use tracing::{debug, info, warn};
use url::Url;

use crate::app::ports::{ObjectStorePort, PutReceipt};
use crate::config::Credentials;
use crate::error::UploadError;
use crate::gateway::sigv4::{uri_encode, Signer, UnsignedRequest};
use crate::types::UploadManifest;

const STS_BODY: &str = "Action=GetCallerIdentity&Version=2011-06-15";
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded; charset=utf-8";

/// S3 (or S3-compatible) object store spoken to over its REST API.
///
/// Without an endpoint override, objects go to the virtual-hosted bucket URL and
/// credentials are checked with STS `GetCallerIdentity`. With an override, paths
/// are bucket-prefixed and credentials are checked by listing buckets.
pub struct S3ObjectStore {
    client: reqwest::Client,
    region: String,
    endpoint: Option<Url>,
}

impl S3ObjectStore {
    pub fn new(region: impl Into<String>, endpoint: Option<&str>) -> Result<Self, UploadError> {
        let endpoint = endpoint
            .map(|e| {
                Url::parse(e).map_err(|err| UploadError::NetworkFailure(format!("bad endpoint {e}: {err}")))
            })
            .transpose()?;
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| UploadError::NetworkFailure(e.to_string()))?;
        Ok(Self {
            client,
            region: region.into(),
            endpoint,
        })
    }

    /// Full URL, Host header value and encoded path for an object.
    pub fn object_location(&self, bucket: &str, key: &str) -> (String, String, String) {
        let key = uri_encode(key.trim_start_matches('/'), false);
        match &self.endpoint {
            Some(endpoint) => {
                let host = host_header(endpoint);
                let base = endpoint.as_str().trim_end_matches('/');
                let path = format!("/{}/{}", uri_encode(bucket, true), key);
                (format!("{base}{path}"), host, path)
            }
            None => {
                let host = format!("{bucket}.s3.{}.amazonaws.com", self.region);
                let path = format!("/{key}");
                (format!("https://{host}{path}"), host, path)
            }
        }
    }

    async fn send_signed(
        &self,
        method: reqwest::Method,
        url: &str,
        request: UnsignedRequest<'_>,
        service: &'static str,
        credentials: &Credentials,
    ) -> Result<(u16, Option<String>, String), UploadError> {
        let body = request.payload.to_vec();
        let headers = Signer::new(self.region.clone(), service).sign(request, credentials, Utc::now());

        let mut builder = self.client.request(method, url).body(body);
        for (name, value) in headers {
            builder = builder.header(name, value);
        }
        let resp = builder
            .send()
            .await
            .map_err(|e| UploadError::NetworkFailure(e.to_string()))?;

        let status = resp.status().as_u16();
        let etag = resp
            .headers()
            .get(ETAG)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.trim_matches('"').to_string());
        let text = match resp.text().await {
            Ok(text) => text,
            Err(e) => {
                debug!(status, error = %e, "Could not read storage response body");
                String::new()
            }
        };
        Ok((status, etag, text))
    }
}

fn host_header(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    }
}

/// Maps a non-success status from a write to an upload error.
pub fn classify_put_status(status: u16, body: &str) -> UploadError {
    let detail = format!("status {status}: {}", body.chars().take(200).collect::<String>());
    match status {
        401 => UploadError::InvalidCredentials,
        403 => UploadError::PermissionDenied(detail),
        _ => UploadError::NetworkFailure(detail),
    }
}

/// Maps a non-success status from the identity check.
pub fn classify_identity_status(status: u16, body: &str) -> UploadError {
    match status {
        400 | 401 | 403 => UploadError::InvalidCredentials,
        _ => UploadError::NetworkFailure(format!(
            "identity check returned status {status}: {}",
            body.chars().take(200).collect::<String>()
        )),
    }
}

#[async_trait]
impl ObjectStorePort for S3ObjectStore {
    async fn verify_credentials(&self, credentials: &Credentials) -> Result<(), UploadError> {
        if credentials.access_key.is_empty() || credentials.secret_key.is_empty() {
            return Err(UploadError::InvalidCredentials);
        }

        let (status, _, body) = match &self.endpoint {
            None => {
                let host = format!("sts.{}.amazonaws.com", self.region);
                let url = format!("https://{host}/");
                let request = UnsignedRequest {
                    method: "POST",
                    host: &host,
                    path: "/",
                    query: &[],
                    headers: vec![("content-type".to_string(), FORM_CONTENT_TYPE.to_string())],
                    payload: STS_BODY.as_bytes(),
                };
                self.send_signed(reqwest::Method::POST, &url, request, "sts", credentials)
                    .await?
            }
            Some(endpoint) => {
                let host = host_header(endpoint);
                let url = format!("{}/", endpoint.as_str().trim_end_matches('/'));
                let request = UnsignedRequest {
                    method: "GET",
                    host: &host,
                    path: "/",
                    query: &[],
                    headers: Vec::new(),
                    payload: b"",
                };
                self.send_signed(reqwest::Method::GET, &url, request, "s3", credentials)
                    .await?
            }
        };

        if (200..300).contains(&status) {
            info!("Credentials are valid");
            Ok(())
        } else {
            warn!(status, "Credentials were rejected");
            Err(classify_identity_status(status, &body))
        }
    }

    async fn put_object(
        &self,
        manifest: &UploadManifest,
        credentials: &Credentials,
    ) -> Result<PutReceipt, UploadError> {
        let (url, host, path) = self.object_location(&manifest.bucket, &manifest.key);
        debug!(%url, bytes = manifest.content.len(), "PUT object");
        let request = UnsignedRequest {
            method: "PUT",
            host: &host,
            path: &path,
            query: &[],
            headers: vec![("content-type".to_string(), manifest.content_type.to_string())],
            payload: &manifest.content,
        };
        let (status, etag, body) = self
            .send_signed(reqwest::Method::PUT, &url, request, "s3", credentials)
            .await?;

        if (200..300).contains(&status) {
            Ok(PutReceipt { etag })
        } else {
            Err(classify_put_status(status, &body))
        }
    }
}
