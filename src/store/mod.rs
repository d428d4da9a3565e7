//! Session store contract and its implementations.
//!
//! The engine only depends on [`SessionStore`]. Two stores agree on the same
//! pairing policy:
//!
//! - text lists are split on newlines, each line trimmed, blank lines dropped,
//!   then zipped by position; the shorter list is padded with empty strings
//! - CSV uploads take the two named columns row by row; a named annotation
//!   column seeds the results (empty cells stay unjudged)

mod export;
mod http;
mod local;

pub use export::{render_table, write_export, EXPORT_FILE_NAME, UNJUDGED_MARKER};
pub use http::HttpStore;
pub use local::LocalStore;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::StoreConfig;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("request to {endpoint} failed: {source}")]
    Request {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint} returned status {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("{endpoint} rejected the request: {message}")]
    Rejected { endpoint: String, message: String },

    #[error("malformed store response: {0}")]
    Malformed(String),

    #[error("column '{0}' not found in CSV header")]
    UnknownColumn(String),

    #[error("index {index} out of range (session has {len} pairs)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// CSV アップロード内容
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub column1: String,
    pub column2: String,
    pub annotation_column: Option<String>,
}

/// セッション初期化リクエスト
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitRequest {
    Lists { list1: String, list2: String },
    Csv(CsvUpload),
}

impl InitRequest {
    pub fn describe(&self) -> String {
        match self {
            InitRequest::Lists { .. } => "text lists".to_string(),
            InitRequest::Csv(upload) => format!(
                "{} ({} / {})",
                upload.file_name, upload.column1, upload.column2
            ),
        }
    }
}

/// Pairs and raw results as the store reports them.
///
/// Results are kept as raw JSON values: a store may hand back numbers or
/// booleans for seeded annotations. Normalization happens in the engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PairsSnapshot {
    pub pairs: Vec<(String, String)>,
    pub results: Vec<Option<serde_json::Value>>,
}

impl PairsSnapshot {
    /// Build a snapshot from already-normalized judgments.
    pub fn from_judgments(pairs: Vec<(String, String)>, results: &[Option<String>]) -> Self {
        Self {
            pairs,
            results: results
                .iter()
                .map(|r| r.clone().map(serde_json::Value::String))
                .collect(),
        }
    }
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Establish pairing from two raw line-delimited lists.
    async fn submit_lists(&self, list1: &str, list2: &str) -> Result<(), StoreError>;

    /// Establish pairing (and optional seeded judgments) from a CSV file.
    async fn submit_csv(&self, upload: &CsvUpload) -> Result<(), StoreError>;

    async fn fetch_pairs(&self) -> Result<PairsSnapshot, StoreError>;

    /// Persist one judgment. Re-submitting the same pair is safe.
    async fn submit_judgment(&self, index: usize, judgment: &str) -> Result<(), StoreError>;

    async fn reset(&self) -> Result<(), StoreError>;

    /// Location of the downloadable results table.
    fn export_url(&self) -> String;

    /// Body of the results table (CSV).
    async fn fetch_export(&self) -> Result<String, StoreError>;

    async fn submit(&self, request: &InitRequest) -> Result<(), StoreError> {
        match request {
            InitRequest::Lists { list1, list2 } => self.submit_lists(list1, list2).await,
            InitRequest::Csv(upload) => self.submit_csv(upload).await,
        }
    }
}

/// Supported store backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Local,
    Http,
}

/// Create a store from configuration
pub fn create_store(config: &StoreConfig) -> Result<Arc<dyn SessionStore>> {
    match config.backend {
        Backend::Local => {
            let path = config.resolved_path();
            let store = LocalStore::open(&path)
                .map_err(|e| anyhow!("Failed to open session file {}: {}", path.display(), e))?;
            Ok(Arc::new(store))
        }
        Backend::Http => Ok(Arc::new(HttpStore::new(&config.url, config.timeout_secs)?)),
    }
}

/// Split a raw list into trimmed, non-blank items.
pub fn split_items(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(String::from)
        .collect()
}

/// Zip two item lists by position, padding the shorter side with `""`.
pub fn zip_pairs(items1: &[String], items2: &[String]) -> Vec<(String, String)> {
    let len = items1.len().max(items2.len());
    (0..len)
        .map(|i| {
            (
                items1.get(i).cloned().unwrap_or_default(),
                items2.get(i).cloned().unwrap_or_default(),
            )
        })
        .collect()
}
