#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use table_scraper::app::ports::{HttpClientPort, HttpGetResult, ObjectStorePort, PutReceipt};
use table_scraper::config::{AppConfig, Credentials, FetchSettings, FileConfig, StorageConfig};
use table_scraper::error::{FetchError, UploadError};
use table_scraper::pipeline::orchestrator::CancelToken;
use table_scraper::types::{SourceSpec, UploadManifest};

pub const ACCESS_KEY: &str = "AKIDEXAMPLE";
pub const SECRET_KEY: &str = "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY";

pub const RANKINGS_HTML: &str = r#"
<html><body>
<table>
  <thead>
    <tr><th>Rank</th><th>Value Rating</th><th>Model</th><th>Price (MSRP)</th><th>Signature</th></tr>
  </thead>
  <tbody>
    <tr><td>S</td><td>5</td><td>Moondrop Blessing 2</td><td>$319</td><td>Neutral with bass boost</td></tr>
    <tr><td>A-</td><td></td><td>Tin HiFi T2</td><td>1,299</td><td>Warm</td></tr>
    <tr><td>A++</td><td>★★★</td><td>Mystery Set</td><td>-5</td><td>Bright</td></tr>
  </tbody>
</table>
</body></html>
"#;

pub const MISMATCHED_HTML: &str = r#"
<table>
  <tr><th>Rank</th><th>Model</th></tr>
  <tr><td>S</td><td>Foo</td></tr>
  <tr><td>A</td></tr>
</table>
"#;

pub fn ok(body: &str) -> Result<HttpGetResult, FetchError> {
    status(200, body)
}

pub fn status(code: u16, body: &str) -> Result<HttpGetResult, FetchError> {
    Ok(HttpGetResult {
        status: code,
        bytes: body.as_bytes().to_vec(),
        final_url: String::new(),
        content_type: "text/html".to_string(),
    })
}

/// Replays a per-URL script of responses; the last entry repeats once the script runs out.
#[derive(Default)]
pub struct ScriptedHttp {
    scripts: Mutex<HashMap<String, Vec<Result<HttpGetResult, FetchError>>>>,
    calls: Mutex<HashMap<String, usize>>,
    cancel_on_get: Option<CancelToken>,
}

impl ScriptedHttp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, url: &str, script: Vec<Result<HttpGetResult, FetchError>>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(url.to_string(), script);
        self
    }

    /// Flips `token` during the first request, as an operator pressing Ctrl-C would.
    pub fn cancelling(mut self, token: CancelToken) -> Self {
        self.cancel_on_get = Some(token);
        self
    }

    pub fn calls(&self, url: &str) -> usize {
        self.calls.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }
}

#[async_trait]
impl HttpClientPort for ScriptedHttp {
    async fn get(&self, url: &str, _timeout: Duration) -> Result<HttpGetResult, FetchError> {
        if let Some(token) = &self.cancel_on_get {
            token.cancel();
        }
        let n = {
            let mut calls = self.calls.lock().unwrap();
            let n = calls.entry(url.to_string()).or_insert(0);
            *n += 1;
            *n
        };
        let scripts = self.scripts.lock().unwrap();
        let script = scripts
            .get(url)
            .unwrap_or_else(|| panic!("no script for {url}"));
        let mut resp = script[(n - 1).min(script.len() - 1)].clone();
        if let Ok(r) = &mut resp {
            r.final_url = url.to_string();
        }
        resp
    }
}

/// Object store that accepts one key pair and keeps every put in memory.
pub struct RecordingStore {
    pub credentials: Credentials,
    verifications: AtomicUsize,
    puts: Mutex<Vec<UploadManifest>>,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self {
            credentials: Credentials::new(ACCESS_KEY, SECRET_KEY),
            verifications: AtomicUsize::new(0),
            puts: Mutex::new(Vec::new()),
        }
    }

    pub fn verifications(&self) -> usize {
        self.verifications.load(Ordering::SeqCst)
    }

    pub fn puts(&self) -> Vec<UploadManifest> {
        self.puts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ObjectStorePort for RecordingStore {
    async fn verify_credentials(&self, credentials: &Credentials) -> Result<(), UploadError> {
        self.verifications.fetch_add(1, Ordering::SeqCst);
        if *credentials == self.credentials {
            Ok(())
        } else {
            Err(UploadError::InvalidCredentials)
        }
    }

    async fn put_object(
        &self,
        manifest: &UploadManifest,
        _credentials: &Credentials,
    ) -> Result<PutReceipt, UploadError> {
        self.puts.lock().unwrap().push(manifest.clone());
        Ok(PutReceipt {
            etag: Some(format!("etag-{}", manifest.content.len())),
        })
    }
}

pub fn storage(credentials: Credentials) -> StorageConfig {
    StorageConfig {
        credentials,
        region: "us-east-1".to_string(),
        bucket: "rankings".to_string(),
        endpoint: None,
    }
}

/// Config with no backoff and no politeness delay.
pub fn app_config(sources: Vec<SourceSpec>) -> AppConfig {
    let file = FileConfig {
        fetch: FetchSettings {
            timeout_seconds: 5,
            max_retries: 3,
            initial_backoff_ms: 0,
            delay_ms: 0,
        },
        concurrency: 2,
        sources,
    };
    AppConfig::new(file, storage(Credentials::new(ACCESS_KEY, SECRET_KEY)))
}
