use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use super::export::{render_table, EXPORT_FILE_NAME};
use super::{split_items, zip_pairs, CsvUpload, PairsSnapshot, SessionStore, StoreError};

/// セッションファイルの中身
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoredSession {
    pairs: Vec<(String, String)>,
    results: Vec<Option<String>>,
}

/// File-backed store implementing the pairing policy in-process.
///
/// The session lives in a JSON file; the export table is rewritten next to it
/// after every mutation so [`SessionStore::export_url`] always resolves.
pub struct LocalStore {
    path: PathBuf,
    state: Mutex<StoredSession>,
}

impl LocalStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let state = if path.exists() {
            let content = fs::read_to_string(path)?;
            let stored: StoredSession = serde_json::from_str(&content)?;
            if stored.pairs.len() != stored.results.len() {
                return Err(StoreError::Malformed(format!(
                    "session file has {} pairs but {} results",
                    stored.pairs.len(),
                    stored.results.len()
                )));
            }
            stored
        } else {
            StoredSession::default()
        };
        debug!(path = %path.display(), pairs = state.pairs.len(), "local store opened");
        Ok(Self {
            path: path.to_path_buf(),
            state: Mutex::new(state),
        })
    }

    fn export_path(&self) -> PathBuf {
        self.path.with_file_name(EXPORT_FILE_NAME)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StoredSession> {
        // A poisoned lock still holds a consistent session: every mutation
        // is persisted before the guard drops.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Persist the session file atomically, then refresh the export table.
    ///
    /// The session file is authoritative: once it is saved, a failed export
    /// refresh is only logged (`fetch_export` renders from memory anyway).
    fn persist(&self, session: &StoredSession) -> Result<(), StoreError> {
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir)?;

        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(serde_json::to_string_pretty(session)?.as_bytes())?;
        tmp.persist(&self.path).map_err(|e| StoreError::Io(e.error))?;

        if let Err(e) = self.refresh_export(session) {
            warn!(path = %self.export_path().display(), error = %e, "failed to refresh export table");
        }
        Ok(())
    }

    fn refresh_export(&self, session: &StoredSession) -> Result<(), StoreError> {
        let table = render_table(&session.pairs, &session.results)?;
        fs::write(self.export_path(), table)?;
        Ok(())
    }

    fn replace(&self, next: StoredSession) -> Result<(), StoreError> {
        let mut state = self.lock();
        self.persist(&next)?;
        *state = next;
        Ok(())
    }
}

/// Build a session from CSV bytes and the selected columns.
fn session_from_csv(upload: &CsvUpload) -> Result<StoredSession, StoreError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(upload.bytes.as_slice());
    let headers = reader.headers()?.clone();
    let position = |name: &str| headers.iter().position(|h| h == name);

    let col1 = position(&upload.column1)
        .ok_or_else(|| StoreError::UnknownColumn(upload.column1.clone()))?;
    let col2 = position(&upload.column2)
        .ok_or_else(|| StoreError::UnknownColumn(upload.column2.clone()))?;
    // 存在しないアノテーションカラムは無視（全件未判定）
    let annotation = upload
        .annotation_column
        .as_deref()
        .filter(|name| !name.is_empty())
        .and_then(position);

    let mut session = StoredSession::default();
    for record in reader.records() {
        let record = record?;
        let cell = |i: usize| record.get(i).unwrap_or("").to_string();
        session.pairs.push((cell(col1), cell(col2)));
        session.results.push(
            annotation
                .and_then(|i| record.get(i))
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(String::from),
        );
    }
    Ok(session)
}

#[async_trait]
impl SessionStore for LocalStore {
    async fn submit_lists(&self, list1: &str, list2: &str) -> Result<(), StoreError> {
        let pairs = zip_pairs(&split_items(list1), &split_items(list2));
        let results = vec![None; pairs.len()];
        debug!(pairs = pairs.len(), "local store: lists submitted");
        self.replace(StoredSession { pairs, results })
    }

    async fn submit_csv(&self, upload: &CsvUpload) -> Result<(), StoreError> {
        let session = session_from_csv(upload)?;
        debug!(
            file = %upload.file_name,
            pairs = session.pairs.len(),
            "local store: csv submitted"
        );
        self.replace(session)
    }

    async fn fetch_pairs(&self) -> Result<PairsSnapshot, StoreError> {
        let state = self.lock();
        Ok(PairsSnapshot::from_judgments(
            state.pairs.clone(),
            &state.results,
        ))
    }

    async fn submit_judgment(&self, index: usize, judgment: &str) -> Result<(), StoreError> {
        let mut state = self.lock();
        let len = state.results.len();
        if index >= len {
            return Err(StoreError::IndexOutOfRange { index, len });
        }
        let mut next = state.clone();
        next.results[index] = Some(judgment.to_string());
        self.persist(&next)?;
        *state = next;
        Ok(())
    }

    async fn reset(&self) -> Result<(), StoreError> {
        self.replace(StoredSession::default())
    }

    fn export_url(&self) -> String {
        format!("file://{}", self.export_path().display())
    }

    async fn fetch_export(&self) -> Result<String, StoreError> {
        let state = self.lock();
        render_table(&state.pairs, &state.results)
    }
}
