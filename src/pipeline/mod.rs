// Scraping pipeline: fetch, extract, validate, upload

pub mod dataset;
pub mod extract;
pub mod fetch;
pub mod orchestrator;
pub mod rate_limiter;
pub mod report;
pub mod upload;
pub mod validate;

// Re-export the stage entry points
pub use extract::{extract, extract_table, find_tables, RawTable, TableHandle};
pub use fetch::{FetchPolicy, Fetcher};
pub use orchestrator::{CancelToken, Orchestrator};
pub use report::{RunReport, SourceOutcome, SourceReport};
pub use upload::{StorageUploader, UploadResult};
pub use validate::{RecordValidator, ValidatedRecord};
