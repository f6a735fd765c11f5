use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::constants::{
    default_sources, ENV_ACCESS_KEY, ENV_BUCKET, ENV_ENDPOINT, ENV_REGION, ENV_SECRET_KEY,
};
use crate::error::ConfigError;
use crate::types::SourceSpec;

/// Optional tuning read from `config.toml`. Every key has a default.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub fetch: FetchSettings,
    pub concurrency: usize,
    pub sources: Vec<SourceSpec>,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            fetch: FetchSettings::default(),
            concurrency: 2,
            sources: default_sources(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    pub timeout_seconds: u64,
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    /// Politeness delay between request starts to the same host.
    pub delay_ms: u64,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            max_retries: 3,
            initial_backoff_ms: 1000,
            delay_ms: 1000,
        }
    }
}

impl FetchSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    pub fn politeness_delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

impl FileConfig {
    /// Reads `path` if it exists, otherwise falls back to defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: FileConfig = toml::from_str(content)?;
        if config.concurrency == 0 {
            return Err(ConfigError::Invalid {
                name: "concurrency".into(),
                message: "must be at least 1".into(),
            });
        }
        if config.fetch.timeout_seconds == 0 {
            return Err(ConfigError::Invalid {
                name: "fetch.timeout_seconds".into(),
                message: "must be greater than 0".into(),
            });
        }
        Ok(config)
    }
}

/// Access key pair for the storage provider. The secret never appears in `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_key: String,
    pub secret_key: String,
}

impl Credentials {
    pub fn new(access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key: secret_key.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    pub credentials: Credentials,
    pub region: String,
    pub bucket: String,
    /// Overrides the provider endpoint, for S3-compatible stores.
    pub endpoint: Option<String>,
}

impl StorageConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the config from any key lookup. Blank values count as missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::Missing(name))
        };

        Ok(Self {
            credentials: Credentials::new(required(ENV_ACCESS_KEY)?, required(ENV_SECRET_KEY)?),
            region: required(ENV_REGION)?,
            bucket: required(ENV_BUCKET)?,
            endpoint: lookup(ENV_ENDPOINT).filter(|v| !v.trim().is_empty()),
        })
    }

    /// Settings for the local directory store, which needs no credentials.
    pub fn local(bucket: impl Into<String>) -> Self {
        Self {
            credentials: Credentials::new("", ""),
            region: "local".to_string(),
            bucket: bucket.into(),
            endpoint: None,
        }
    }
}

/// Everything a run needs, built once at startup and passed down.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub fetch: FetchSettings,
    pub concurrency: usize,
    pub sources: Vec<SourceSpec>,
    pub storage: StorageConfig,
    /// When false, raw records are uploaded without schema validation.
    pub validate: bool,
}

impl AppConfig {
    pub fn new(file: FileConfig, storage: StorageConfig) -> Self {
        Self {
            fetch: file.fetch,
            concurrency: file.concurrency,
            sources: file.sources,
            storage,
            validate: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_storage_config_from_lookup() {
        let vars = env(&[
            ("AWS_ACCESS_KEY", "AKIDEXAMPLE"),
            ("AWS_SECRET_KEY", "secret"),
            ("REGION", "eu-west-1"),
            ("BUCKET_NAME", "rankings"),
        ]);
        let config = StorageConfig::from_lookup(|k| vars.get(k).cloned()).unwrap();
        assert_eq!(config.region, "eu-west-1");
        assert_eq!(config.bucket, "rankings");
        assert_eq!(config.credentials.access_key, "AKIDEXAMPLE");
        assert!(config.endpoint.is_none());
    }

    #[test]
    fn test_missing_setting_is_named() {
        let vars = env(&[
            ("AWS_ACCESS_KEY", "AKIDEXAMPLE"),
            ("AWS_SECRET_KEY", "secret"),
            ("REGION", "  "),
            ("BUCKET_NAME", "rankings"),
        ]);
        let err = StorageConfig::from_lookup(|k| vars.get(k).cloned()).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("REGION")));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let creds = Credentials::new("AKIDEXAMPLE", "topsecret");
        let printed = format!("{:?}", creds);
        assert!(!printed.contains("topsecret"));
        assert!(printed.contains("AKIDEXAMPLE"));
    }

    #[test]
    fn test_file_config_defaults_and_overrides() {
        let config = FileConfig::parse(
            r#"
            concurrency = 4

            [fetch]
            max_retries = 5
            delay_ms = 250

            [[sources]]
            url = "https://example.com/rankings/"
            output_name = "example"
            table_index = 1
            "#,
        )
        .unwrap();
        assert_eq!(config.concurrency, 4);
        assert_eq!(config.fetch.max_retries, 5);
        assert_eq!(config.fetch.timeout_seconds, 30);
        assert_eq!(config.fetch.politeness_delay(), Duration::from_millis(250));
        assert_eq!(config.sources.len(), 1);
        assert_eq!(config.sources[0].table_index, 1);
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        assert!(FileConfig::parse("concurrency = 0").is_err());
    }
}
