use crate::error::CollectorError;
use log::error;
use serde::Deserialize;
use std::str::from_utf8;

#[derive(Debug, Deserialize)]
pub struct CollectorToml {
    pub output: Output,
    pub collection: Collection,
    pub samples: Vec<SampleEntry>,
}

#[derive(Debug, Deserialize)]
pub struct Output {
    pub name: String,
    pub directory: String,
    /// `archive` or `directory`
    pub format: String,
    pub compression: Option<u32>,
    pub password: Option<String>,
    /// `lf` or `crlf` manifest rows
    pub line_ending: Option<String>,
    pub logging: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Collection {
    pub content: Option<ContentOptions>,
    pub limits: Option<LimitOptions>,
    pub hashes: Option<HashOptions>,
    pub fuzzy: Option<FuzzyOptions>,
    /// Keep manifest rows (and hashes) for samples rejected by limits
    pub report_all: Option<bool>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ContentOptions {
    #[serde(rename = "type")]
    pub content_type: Option<String>,
    pub min_chars: Option<u32>,
    pub max_chars: Option<u32>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LimitOptions {
    pub max_sample_count: Option<u64>,
    pub max_bytes_per_sample: Option<u64>,
    pub max_bytes_total: Option<u64>,
    pub ignore_limits: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct HashOptions {
    pub md5: Option<bool>,
    pub sha1: Option<bool>,
    pub sha256: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct FuzzyOptions {
    pub ssdeep: Option<bool>,
    pub tlsh: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct SampleEntry {
    /// Optional archive subdirectory prefix for this spec's samples
    pub name: Option<String>,
    pub terms: Vec<TermEntry>,
    pub content: Option<ContentOptions>,
    pub limits: Option<LimitOptions>,
}

#[derive(Debug, Deserialize)]
pub struct TermEntry {
    pub name: String,
    pub description: Option<String>,
}

impl CollectorToml {
    /// Parse an already read TOML collection definition
    pub fn parse_collector_toml(data: &[u8]) -> Result<CollectorToml, CollectorError> {
        let toml_results = toml::from_str(from_utf8(data).unwrap_or_default());
        match toml_results {
            Ok(results) => Ok(results),
            Err(err) => {
                error!("[structs] Failed to parse TOML data: {err:?}");
                Err(CollectorError::BadToml)
            }
        }
    }
}
