//! Source and storage constants shared across the codebase

use crate::types::SourceSpec;

// Pages scraped when no sources are configured
pub const IEMS_URL: &str = "https://crinacle.com/rankings/iems/";
pub const HEADPHONES_URL: &str = "https://crinacle.com/rankings/headphones/";

pub const IEMS_OUTPUT: &str = "iems";
pub const HEADPHONES_OUTPUT: &str = "headphones";

/// Browser-like identity so the source does not reject us as a bot.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

pub const CSV_CONTENT_TYPE: &str = "text/csv";

// Environment variable names for storage settings
pub const ENV_ACCESS_KEY: &str = "AWS_ACCESS_KEY";
pub const ENV_SECRET_KEY: &str = "AWS_SECRET_KEY";
pub const ENV_REGION: &str = "REGION";
pub const ENV_BUCKET: &str = "BUCKET_NAME";
pub const ENV_ENDPOINT: &str = "STORAGE_ENDPOINT";

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

pub fn default_sources() -> Vec<SourceSpec> {
    vec![
        SourceSpec::new(IEMS_URL, IEMS_OUTPUT),
        SourceSpec::new(HEADPHONES_URL, HEADPHONES_OUTPUT),
    ]
}
