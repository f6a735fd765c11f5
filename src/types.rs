use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Result of one successful fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageFetch {
    pub status: u16,
    pub body: String,
    /// URL after redirects were followed.
    pub final_url: String,
    pub attempts: u32,
}

/// One data row keyed by column name, in header order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Record {
    fields: Vec<(String, String)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            fields: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn push(&mut self, column: impl Into<String>, value: impl Into<String>) {
        self.fields.push((column.into(), value.into()));
    }

    /// First value stored under `column`.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == column)
            .map(|(_, v)| v.as_str())
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Everything needed for a single object put.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadManifest {
    pub bucket: String,
    pub key: String,
    pub content: Vec<u8>,
    pub content_type: &'static str,
}

/// A page to scrape and the name its CSV is stored under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSpec {
    pub url: String,
    pub output_name: String,
    #[serde(default)]
    pub table_index: usize,
}

impl SourceSpec {
    pub fn new(url: impl Into<String>, output_name: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            output_name: output_name.into(),
            table_index: 0,
        }
    }

    pub fn with_table_index(mut self, index: usize) -> Self {
        self.table_index = index;
        self
    }

    /// Deterministic key so repeated runs overwrite the same object.
    pub fn object_key(&self) -> String {
        format!("{}.csv", self.output_name)
    }
}

/// Parses `URL=NAME` or `URL=NAME#INDEX`. The name is taken after the last `=`.
impl FromStr for SourceSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (url, rest) = s
            .rsplit_once('=')
            .ok_or_else(|| format!("expected URL=NAME, got '{s}'"))?;
        let (name, index) = match rest.split_once('#') {
            Some((name, index)) => {
                let index = index
                    .parse::<usize>()
                    .map_err(|e| format!("bad table index '{index}': {e}"))?;
                (name, index)
            }
            None => (rest, 0),
        };
        if url.trim().is_empty() || name.trim().is_empty() {
            return Err(format!("expected URL=NAME, got '{s}'"));
        }
        Ok(SourceSpec::new(url.trim(), name.trim()).with_table_index(index))
    }
}

/// Pipeline stages a source moves through, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Stage {
    Idle,
    Fetching,
    Extracting,
    Validating,
    Uploading,
    Done,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Idle => "idle",
            Stage::Fetching => "fetching",
            Stage::Extracting => "extracting",
            Stage::Validating => "validating",
            Stage::Uploading => "uploading",
            Stage::Done => "done",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
