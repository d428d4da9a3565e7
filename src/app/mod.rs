use anyhow::Result;
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::Stdout;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::debug;

use crate::loader::{ExportResult, FetchResult, JudgmentResult, StartOutcome};
use crate::ui;
use simjudge::config::Config;
use simjudge::error::SessionError;
use simjudge::labels::LabelSet;
use simjudge::session::Engine;
use simjudge::source::SourceConfig;
use simjudge::store::{SessionStore, StoreError};

mod types;
pub use types::*;

mod input;
mod line_input;
mod polling;

pub use line_input::LineInput;

const SPINNER_FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// 送信結果メッセージの表示時間
const SUBMISSION_RESULT_TTL_SECS: u64 = 3;

pub struct App {
    pub config: Config,
    pub engine: Engine,
    pub labels: LabelSet,
    /// 入力ソース設定（セットアップ画面で編集）
    pub source: SourceConfig,
    pub state: AppState,
    /// Help / TextInput からの戻り先
    pub previous_state: AppState,
    pub input: LineInput,
    pub input_target: Option<InputTarget>,
    pub should_quit: bool,
    /// ヘルプ画面のスクロールオフセット（行単位）
    pub help_scroll_offset: usize,
    /// 結果テーブルのスクロールオフセット（描画時に更新）
    pub results_scroll_offset: usize,
    /// ラベルバーの選択位置（数字キー以外で判定するため）
    pub label_cursor: usize,
    /// Reset confirmation prompt is active
    pending_reset_confirm: bool,
    /// エディタ起動要求（端末を一時停止してから開く）
    pending_editor: Option<ListSlot>,
    // Receivers
    start_receiver: Option<mpsc::Receiver<StartOutcome>>,
    fetch_receiver: Option<mpsc::Receiver<FetchResult>>,
    judgment_receiver: Option<mpsc::Receiver<JudgmentResult>>,
    reset_receiver: Option<mpsc::Receiver<Result<(), StoreError>>>,
    export_receiver: Option<mpsc::Receiver<ExportResult>>,
    /// Last operation result: (success, message)
    pub submission_result: Option<(bool, String)>,
    /// Timestamp when result was set (for auto-hide)
    submission_result_time: Option<Instant>,
    /// Spinner animation frame counter (incremented each tick)
    pub spinner_frame: usize,
}

impl App {
    pub fn new(
        config: Config,
        store: Arc<dyn SessionStore>,
        labels: LabelSet,
        source: SourceConfig,
    ) -> Self {
        Self {
            config,
            engine: Engine::new(store),
            labels,
            source,
            state: AppState::Setup,
            previous_state: AppState::Setup,
            input: LineInput::default(),
            input_target: None,
            should_quit: false,
            help_scroll_offset: 0,
            results_scroll_offset: 0,
            label_cursor: 0,
            pending_reset_confirm: false,
            pending_editor: None,
            start_receiver: None,
            fetch_receiver: None,
            judgment_receiver: None,
            reset_receiver: None,
            export_receiver: None,
            submission_result: None,
            submission_result_time: None,
            spinner_frame: 0,
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        let mut terminal = ui::setup_terminal()?;

        while !self.should_quit {
            self.spinner_frame = self.spinner_frame.wrapping_add(1);
            self.poll_updates();
            self.expire_submission_result();
            terminal.draw(|frame| ui::render(frame, self))?;
            self.handle_input()?;
            if let Some(slot) = self.pending_editor.take() {
                self.open_list_editor(slot, &mut terminal)?;
            }
        }

        ui::restore_terminal(&mut terminal)?;
        Ok(())
    }

    /// Get the current spinner character for loading animations
    pub fn spinner_char(&self) -> &str {
        SPINNER_FRAMES[self.spinner_frame % SPINNER_FRAMES.len()]
    }

    /// バックグラウンド処理が実行中か
    pub fn is_busy(&self) -> bool {
        self.start_receiver.is_some()
            || self.fetch_receiver.is_some()
            || self.judgment_receiver.is_some()
            || self.reset_receiver.is_some()
            || self.export_receiver.is_some()
    }

    pub fn is_starting(&self) -> bool {
        self.start_receiver.is_some()
    }

    pub fn is_fetching(&self) -> bool {
        self.fetch_receiver.is_some()
    }

    pub fn is_exporting(&self) -> bool {
        self.export_receiver.is_some()
    }

    pub fn is_resetting(&self) -> bool {
        self.reset_receiver.is_some()
    }

    pub fn is_pending_reset_confirmation(&self) -> bool {
        self.pending_reset_confirm
    }

    pub fn can_start(&self) -> bool {
        self.source.can_start(&self.labels)
    }

    pub(crate) fn set_submission_result(&mut self, success: bool, message: String) {
        self.submission_result = Some((success, message));
        self.submission_result_time = Some(Instant::now());
    }

    fn expire_submission_result(&mut self) {
        if let Some(since) = self.submission_result_time {
            if since.elapsed().as_secs() >= SUBMISSION_RESULT_TTL_SECS {
                self.submission_result = None;
                self.submission_result_time = None;
            }
        }
    }

    // ── background operations ──

    /// Submit the configured input and enter comparing mode when it lands.
    pub(crate) fn start_session(&mut self) {
        if self.start_receiver.is_some() {
            return;
        }
        if self.labels.is_empty() {
            self.engine
                .record_error(SessionError::Input("Add at least one label".to_string()));
            return;
        }
        let Some(request) = self.source.init_request() else {
            let message = match self.source.mode {
                simjudge::source::InputMode::Text => "Both lists need at least one item",
                simjudge::source::InputMode::Csv => "Load a CSV file first",
            };
            self.engine.record_error(SessionError::Input(message.to_string()));
            return;
        };

        self.engine.clear_error();
        let (tx, rx) = mpsc::channel(1);
        self.start_receiver = Some(rx);
        tokio::spawn(crate::loader::start_session(self.engine.store(), request, tx));
    }

    /// 既存セッションを再取得する（起動時の --resume とリフレッシュ）
    ///
    /// Ignored while a judgment is in flight: the fetched snapshot would
    /// replace the optimistic write before the store confirms it.
    pub(crate) fn refresh(&mut self) {
        if self.fetch_receiver.is_some()
            || self.start_receiver.is_some()
            || self.engine.is_judgment_pending()
        {
            return;
        }
        self.engine.clear_error();
        let (tx, rx) = mpsc::channel(1);
        self.fetch_receiver = Some(rx);
        tokio::spawn(crate::loader::fetch_session(self.engine.store(), tx));
    }

    /// Enter comparing mode on the stored session without submitting input.
    pub fn resume(&mut self) {
        self.state = AppState::Annotating;
        self.refresh();
    }

    pub(crate) fn judge(&mut self, label: &str) {
        let Some((index, label)) = self.engine.begin_judgment(label) else {
            return;
        };
        debug!(index, label = %label, "submitting judgment");
        let (tx, rx) = mpsc::channel(1);
        self.judgment_receiver = Some(rx);
        tokio::spawn(crate::loader::submit_judgment(
            self.engine.store(),
            index,
            label,
            tx,
        ));
    }

    pub(crate) fn judge_slot(&mut self, slot: usize) {
        if let Some(label) = self.labels.get(slot) {
            self.judge(&label);
        }
    }

    /// Highlighted label slot, clamped to the current label count.
    pub fn selected_label(&self) -> usize {
        self.label_cursor
            .min(self.labels.labels().len().saturating_sub(1))
    }

    /// Move the label highlight, wrapping at both ends.
    pub(crate) fn move_label_cursor(&mut self, forward: bool) {
        let len = self.labels.labels().len();
        if len == 0 {
            return;
        }
        let current = self.selected_label();
        self.label_cursor = if forward {
            (current + 1) % len
        } else {
            (current + len - 1) % len
        };
    }

    pub(crate) fn request_reset(&mut self) {
        if self.reset_receiver.is_some() {
            return;
        }
        self.pending_reset_confirm = false;
        self.engine.clear_error();
        let (tx, rx) = mpsc::channel(1);
        self.reset_receiver = Some(rx);
        tokio::spawn(crate::loader::reset_session(self.engine.store(), tx));
    }

    pub(crate) fn export(&mut self) {
        if self.export_receiver.is_some() {
            return;
        }
        let target: PathBuf = self.config.export.dir.clone();
        let (tx, rx) = mpsc::channel(1);
        self.export_receiver = Some(rx);
        tokio::spawn(crate::loader::export_results(self.engine.store(), target, tx));
    }

    /// Discard all input configuration after a confirmed reset.
    fn clear_setup(&mut self) {
        self.labels.reset();
        self.source = SourceConfig::default();
        self.results_scroll_offset = 0;
        self.label_cursor = 0;
        self.state = AppState::Setup;
    }

    // ── external editor ──

    fn open_list_editor(
        &mut self,
        slot: ListSlot,
        terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    ) -> Result<()> {
        let initial = match slot {
            ListSlot::First => self.source.text.list1.clone(),
            ListSlot::Second => self.source.text.list2.clone(),
        };

        ui::restore_terminal(terminal)?;
        let edited =
            crate::editor::open_list_editor(self.config.editor.as_deref(), slot.name(), &initial);
        *terminal = ui::setup_terminal()?;

        match edited {
            Ok(Some(text)) => self.set_list(slot, text),
            Ok(None) => {}
            Err(e) => self
                .engine
                .record_error(SessionError::Input(format!("{:#}", e))),
        }
        Ok(())
    }

    pub(crate) fn set_list(&mut self, slot: ListSlot, text: String) {
        match slot {
            ListSlot::First => self.source.text.list1 = text,
            ListSlot::Second => self.source.text.list2 = text,
        }
    }

    #[cfg(test)]
    pub fn new_for_test(store: Arc<dyn SessionStore>) -> Self {
        Self::new(
            Config::default(),
            store,
            LabelSet::default(),
            SourceConfig::default(),
        )
    }
}
