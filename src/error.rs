use thiserror::Error;

use crate::types::Stage;

/// Network-layer failures from the fetcher.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("HTTP status {0}")]
    HttpStatus(u16),

    #[error("response body was empty")]
    EmptyBody,

    #[error("retries exhausted after {attempts} attempts (last: {last})")]
    RetriesExhausted { attempts: u32, last: Box<FetchError> },
}

impl FetchError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Timeout | FetchError::ConnectionFailed(_) => true,
            FetchError::HttpStatus(code) => (500..600).contains(code),
            _ => false,
        }
    }
}

/// Structural mismatch between the page and the expected table shape.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("no tables found on the page")]
    NoTables,

    #[error("table index {index} is out of range, only {found} tables found")]
    TableIndexOutOfRange { index: usize, found: usize },

    #[error("table has no rows to take a header from")]
    EmptyTable,

    #[error("row {row_index} has {found} cells, header has {expected}")]
    RowShapeMismatch {
        row_index: usize,
        expected: usize,
        found: usize,
    },
}

/// Storage-layer failures from the uploader.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UploadError {
    #[error("storage credentials were rejected")]
    InvalidCredentials,

    #[error("network failure talking to storage: {0}")]
    NetworkFailure(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("failed to serialize records: {0}")]
    Serialization(String),
}

impl From<csv::Error> for UploadError {
    fn from(err: csv::Error) -> Self {
        UploadError::Serialization(err.to_string())
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required setting: {0}")]
    Missing(&'static str),

    #[error("invalid setting {name}: {message}")]
    Invalid { name: String, message: String },

    #[error("failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Why a single source's run stopped before reaching `Done`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error("run cancelled before {0}")]
    Cancelled(Stage),

    #[error("task failed: {0}")]
    Task(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
