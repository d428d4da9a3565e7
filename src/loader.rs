use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use simjudge::store::{write_export, InitRequest, PairsSnapshot, SessionStore, StoreError};

/// セッション開始（送信 → 取得）の結果
pub enum StartOutcome {
    /// 入力の送信に失敗（比較モードには入らない）
    SubmitFailed(StoreError),
    /// 送信成功。取得結果は成否にかかわらず比較モードへ
    Fetched(Result<PairsSnapshot, StoreError>),
}

pub type FetchResult = Result<PairsSnapshot, StoreError>;

/// 判定送信の結果（送信インデックス付き）
pub struct JudgmentResult {
    pub index: usize,
    pub result: Result<(), StoreError>,
}

/// エクスポート結果
pub enum ExportResult {
    Saved(PathBuf),
    Error(String),
}

/// 入力を送信し、続けてペアを取得する
pub async fn start_session(
    store: Arc<dyn SessionStore>,
    request: InitRequest,
    tx: mpsc::Sender<StartOutcome>,
) {
    debug!(source = %request.describe(), "submitting session input");
    if let Err(e) = store.submit(&request).await {
        let _ = tx.send(StartOutcome::SubmitFailed(e)).await;
        return;
    }
    let fetched = store.fetch_pairs().await;
    let _ = tx.send(StartOutcome::Fetched(fetched)).await;
}

/// ペアと判定結果を再取得
pub async fn fetch_session(store: Arc<dyn SessionStore>, tx: mpsc::Sender<FetchResult>) {
    let _ = tx.send(store.fetch_pairs().await).await;
}

pub async fn submit_judgment(
    store: Arc<dyn SessionStore>,
    index: usize,
    label: String,
    tx: mpsc::Sender<JudgmentResult>,
) {
    let result = store.submit_judgment(index, &label).await;
    let _ = tx.send(JudgmentResult { index, result }).await;
}

pub async fn reset_session(store: Arc<dyn SessionStore>, tx: mpsc::Sender<Result<(), StoreError>>) {
    let _ = tx.send(store.reset().await).await;
}

/// 結果テーブルを取得して `target` に書き出す
pub async fn export_results(
    store: Arc<dyn SessionStore>,
    target: PathBuf,
    tx: mpsc::Sender<ExportResult>,
) {
    let outcome = match store.fetch_export().await {
        Ok(body) => match write_export(&target, &body) {
            Ok(path) => ExportResult::Saved(path),
            Err(e) => ExportResult::Error(format!("{:#}", e)),
        },
        Err(e) => {
            warn!(url = %store.export_url(), error = %e, "export download failed");
            ExportResult::Error(format!("Failed to download results: {}", e))
        }
    };
    let _ = tx.send(outcome).await;
}
