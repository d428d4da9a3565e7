use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

use super::{CsvUpload, PairsSnapshot, SessionStore, StoreError};

const LISTS_PATH: &str = "/api/lists";
const UPLOAD_CSV_PATH: &str = "/api/upload_csv";
const PAIRS_PATH: &str = "/api/pairs";
const JUDGMENT_PATH: &str = "/api/judgment";
const RESET_PATH: &str = "/api/reset";
const DOWNLOAD_PATH: &str = "/api/results/download";

/// Client for a remote annotation backend speaking the `/api/*` REST API.
pub struct HttpStore {
    client: reqwest::Client,
    base_url: String,
}

impl HttpStore {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        let path = path.trim_start_matches('/');
        format!("{}/{}", self.base_url, path)
    }

    async fn send(
        &self,
        endpoint: &str,
        builder: reqwest::RequestBuilder,
    ) -> Result<String, StoreError> {
        let resp = builder.send().await.map_err(|source| StoreError::Request {
            endpoint: endpoint.to_string(),
            source,
        })?;
        let status = resp.status();
        let body = resp.text().await.map_err(|source| StoreError::Request {
            endpoint: endpoint.to_string(),
            source,
        })?;
        debug!(endpoint, status = status.as_u16(), "store response");

        if !status.is_success() {
            warn!(endpoint, status = status.as_u16(), "store request failed");
            return Err(StoreError::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                body,
            });
        }
        if let Some(message) = rejection_message(&body) {
            warn!(endpoint, %message, "store rejected request");
            return Err(StoreError::Rejected {
                endpoint: endpoint.to_string(),
                message,
            });
        }
        Ok(body)
    }
}

/// Detect an error payload in a 2xx response.
///
/// The backend reports some failures as `{"error": "..."}` or as the tuple
/// `[{"error": "..."}, 400]` with status 200.
fn rejection_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    let object = match &value {
        Value::Object(_) => &value,
        Value::Array(items) => items.first()?,
        _ => return None,
    };
    let error = object.get("error")?;
    Some(match error {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    })
}

fn parse_snapshot(body: &str) -> Result<PairsSnapshot, StoreError> {
    let snapshot: PairsSnapshot = serde_json::from_str(body)?;
    if snapshot.pairs.len() != snapshot.results.len() {
        return Err(StoreError::Malformed(format!(
            "received {} pairs but {} results",
            snapshot.pairs.len(),
            snapshot.results.len()
        )));
    }
    Ok(snapshot)
}

#[async_trait]
impl SessionStore for HttpStore {
    async fn submit_lists(&self, list1: &str, list2: &str) -> Result<(), StoreError> {
        let builder = self
            .client
            .post(self.url(LISTS_PATH))
            .json(&json!({ "list1": list1, "list2": list2 }));
        self.send(LISTS_PATH, builder).await.map(|_| ())
    }

    async fn submit_csv(&self, upload: &CsvUpload) -> Result<(), StoreError> {
        let file = Part::bytes(upload.bytes.clone())
            .file_name(upload.file_name.clone())
            .mime_str("text/csv")
            .map_err(|source| StoreError::Request {
                endpoint: UPLOAD_CSV_PATH.to_string(),
                source,
            })?;
        let mut form = Form::new()
            .part("file", file)
            .text("column1", upload.column1.clone())
            .text("column2", upload.column2.clone());
        if let Some(column) = upload.annotation_column.as_ref().filter(|c| !c.is_empty()) {
            form = form.text("annotation_column", column.clone());
        }
        let builder = self.client.post(self.url(UPLOAD_CSV_PATH)).multipart(form);
        self.send(UPLOAD_CSV_PATH, builder).await.map(|_| ())
    }

    async fn fetch_pairs(&self) -> Result<PairsSnapshot, StoreError> {
        let builder = self.client.get(self.url(PAIRS_PATH));
        let body = self.send(PAIRS_PATH, builder).await?;
        parse_snapshot(&body)
    }

    async fn submit_judgment(&self, index: usize, judgment: &str) -> Result<(), StoreError> {
        let builder = self
            .client
            .post(self.url(JUDGMENT_PATH))
            .json(&json!({ "index": index, "judgment": judgment }));
        self.send(JUDGMENT_PATH, builder).await.map(|_| ())
    }

    async fn reset(&self) -> Result<(), StoreError> {
        let builder = self.client.delete(self.url(RESET_PATH));
        self.send(RESET_PATH, builder).await.map(|_| ())
    }

    fn export_url(&self) -> String {
        self.url(DOWNLOAD_PATH)
    }

    async fn fetch_export(&self) -> Result<String, StoreError> {
        let builder = self.client.get(self.export_url());
        self.send(DOWNLOAD_PATH, builder).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_building() {
        let store = HttpStore::new("http://localhost:8000/", 5).unwrap();
        assert_eq!(store.url("/api/pairs"), "http://localhost:8000/api/pairs");
        assert_eq!(store.url("api/pairs"), "http://localhost:8000/api/pairs");
        assert_eq!(
            store.export_url(),
            "http://localhost:8000/api/results/download"
        );
    }

    #[test]
    fn test_rejection_message_detects_error_object() {
        assert_eq!(
            rejection_message(r#"{"error": "Index out of range."}"#).as_deref(),
            Some("Index out of range.")
        );
    }

    #[test]
    fn test_rejection_message_detects_error_tuple() {
        assert_eq!(
            rejection_message(r#"[{"error": "'word'"}, 400]"#).as_deref(),
            Some("'word'")
        );
    }

    #[test]
    fn test_rejection_message_ignores_success_payloads() {
        assert_eq!(rejection_message(r#"{"message": "Data reset."}"#), None);
        assert_eq!(rejection_message("list1_item,list2_item,judgment"), None);
        assert_eq!(rejection_message("[1, 2]"), None);
    }

    #[test]
    fn test_parse_snapshot_rejects_length_mismatch() {
        let err = parse_snapshot(r#"{"pairs": [["a", "b"]], "results": []}"#).unwrap_err();
        assert!(matches!(err, StoreError::Malformed(_)));
    }

    #[test]
    fn test_parse_snapshot_accepts_mixed_results() {
        let snapshot =
            parse_snapshot(r#"{"pairs": [["a", "b"], ["c", "d"]], "results": [1, ""]}"#)
                .unwrap();
        assert_eq!(snapshot.results.len(), 2);
    }
}
