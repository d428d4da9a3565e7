use tokio::sync::mpsc;
use tracing::warn;

use crate::loader::{ExportResult, StartOutcome};

use super::{App, AppState};

impl App {
    /// バックグラウンドタスクの結果をまとめてポーリング
    pub(crate) fn poll_updates(&mut self) {
        self.poll_start_updates();
        self.poll_fetch_updates();
        self.poll_judgment_updates();
        self.poll_reset_updates();
        self.poll_export_updates();
    }

    pub(crate) fn poll_start_updates(&mut self) {
        let Some(ref mut rx) = self.start_receiver else {
            return;
        };

        match rx.try_recv() {
            Ok(StartOutcome::SubmitFailed(e)) => {
                self.engine.fail_start(e);
                self.start_receiver = None;
            }
            Ok(StartOutcome::Fetched(result)) => {
                // 取得に失敗しても比較モードに入る（空セッション + エラー表示）
                self.engine.apply_fetch(result);
                self.results_scroll_offset = 0;
                self.state = AppState::Annotating;
                self.start_receiver = None;
            }
            Err(mpsc::error::TryRecvError::Empty) => {}
            Err(mpsc::error::TryRecvError::Disconnected) => {
                self.start_receiver = None;
            }
        }
    }

    pub(crate) fn poll_fetch_updates(&mut self) {
        let Some(ref mut rx) = self.fetch_receiver else {
            return;
        };

        match rx.try_recv() {
            Ok(result) => {
                self.engine.apply_fetch(result);
                self.fetch_receiver = None;
            }
            Err(mpsc::error::TryRecvError::Empty) => {}
            Err(mpsc::error::TryRecvError::Disconnected) => {
                self.fetch_receiver = None;
            }
        }
    }

    pub(crate) fn poll_judgment_updates(&mut self) {
        let Some(ref mut rx) = self.judgment_receiver else {
            return;
        };

        match rx.try_recv() {
            Ok(judgment) => {
                if let Err(ref e) = judgment.result {
                    warn!(index = judgment.index, error = %e, "judgment rejected");
                }
                self.engine.complete_judgment(judgment.result);
                self.judgment_receiver = None;
            }
            Err(mpsc::error::TryRecvError::Empty) => {}
            Err(mpsc::error::TryRecvError::Disconnected) => {
                // タスクが結果を返さずに終了した: 楽観的更新を取り消す
                self.engine
                    .complete_judgment(Err(simjudge::store::StoreError::Malformed(
                        "judgment task ended without a response".to_string(),
                    )));
                self.judgment_receiver = None;
            }
        }
    }

    pub(crate) fn poll_reset_updates(&mut self) {
        let Some(ref mut rx) = self.reset_receiver else {
            return;
        };

        match rx.try_recv() {
            Ok(result) => {
                self.reset_receiver = None;
                if self.engine.apply_reset(result) {
                    self.clear_setup();
                    self.set_submission_result(true, "Session reset".to_string());
                }
            }
            Err(mpsc::error::TryRecvError::Empty) => {}
            Err(mpsc::error::TryRecvError::Disconnected) => {
                self.reset_receiver = None;
            }
        }
    }

    pub(crate) fn poll_export_updates(&mut self) {
        let Some(ref mut rx) = self.export_receiver else {
            return;
        };

        match rx.try_recv() {
            Ok(ExportResult::Saved(path)) => {
                self.set_submission_result(true, format!("Saved {}", path.display()));
                self.export_receiver = None;
            }
            Ok(ExportResult::Error(message)) => {
                self.set_submission_result(false, message);
                self.export_receiver = None;
            }
            Err(mpsc::error::TryRecvError::Empty) => {}
            Err(mpsc::error::TryRecvError::Disconnected) => {
                self.export_receiver = None;
            }
        }
    }
}
