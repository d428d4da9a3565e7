use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::path::PathBuf;

use simjudge::error::SessionError;
use simjudge::source::{CsvSelection, InputMode};

use super::types::*;
use super::{App, AppState};

/// Label shortcut slot for a number key (`1` → 0 … `9` → 8)
fn digit_slot(key: &KeyEvent) -> Option<usize> {
    match key.code {
        KeyCode::Char(c @ '1'..='9') => c.to_digit(10).map(|d| d as usize - 1),
        _ => None,
    }
}

impl App {
    pub(crate) fn handle_input(&mut self) -> Result<()> {
        if event::poll(std::time::Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                // Kitty keyboard protocol が有効な場合、Release/Repeat イベントも
                // 報告されるため、Press のみ処理して二重実行を防止する。
                if key.kind != KeyEventKind::Press {
                    return Ok(());
                }
                self.handle_key(key);
            }
        }
        Ok(())
    }

    pub(crate) fn handle_key(&mut self, key: KeyEvent) {
        if self.pending_reset_confirm {
            match self.handle_pending_reset_choice(&key) {
                PendingResetChoice::Confirm => self.request_reset(),
                PendingResetChoice::Cancel => self.pending_reset_confirm = false,
                PendingResetChoice::Ignore => {}
            }
            return;
        }

        match self.state {
            AppState::Setup => self.handle_setup_input(key),
            AppState::Annotating => self.handle_annotate_input(key),
            AppState::Help => self.handle_help_input(key),
            AppState::TextInput => self.handle_text_input(key),
        }
    }

    fn handle_pending_reset_choice(&self, key: &KeyEvent) -> PendingResetChoice {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => PendingResetChoice::Confirm,
            KeyCode::Char(c) if c == self.config.keybindings.reset => PendingResetChoice::Confirm,
            KeyCode::Char('n') | KeyCode::Esc => PendingResetChoice::Cancel,
            KeyCode::Char(c) if c == self.config.keybindings.quit => PendingResetChoice::Cancel,
            _ => PendingResetChoice::Ignore,
        }
    }

    fn open_help(&mut self) {
        self.previous_state = self.state;
        self.help_scroll_offset = 0;
        self.state = AppState::Help;
    }

    fn open_text_input(&mut self, target: InputTarget, initial: &str) {
        self.previous_state = self.state;
        self.input = super::LineInput::with_text(initial);
        self.input_target = Some(target);
        self.state = AppState::TextInput;
    }

    // ── setup screen ──

    fn handle_setup_input(&mut self, key: KeyEvent) {
        let kb = self.config.keybindings.clone();

        match key.code {
            KeyCode::Char(c) if c == kb.quit => self.should_quit = true,
            KeyCode::Char(c) if c == kb.help => self.open_help(),
            KeyCode::Tab | KeyCode::BackTab => {
                self.source.mode = self.source.mode.toggle();
            }
            KeyCode::Enter => self.start_session(),
            KeyCode::Char(c) if c == kb.edit_labels => {
                let raw = self.labels.raw().to_string();
                self.open_text_input(InputTarget::Labels, &raw);
            }
            KeyCode::Char(c) if c == kb.add_label => {
                self.open_text_input(InputTarget::NewLabel, "");
            }
            KeyCode::Char(c) if c == kb.refresh => self.resume(),
            _ => match self.source.mode {
                InputMode::Text => self.handle_text_source_input(key),
                InputMode::Csv => self.handle_csv_source_input(key, &kb),
            },
        }
    }

    fn handle_text_source_input(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('1') => self.pending_editor = Some(ListSlot::First),
            KeyCode::Char('2') => self.pending_editor = Some(ListSlot::Second),
            _ => {}
        }
    }

    fn handle_csv_source_input(&mut self, key: KeyEvent, kb: &simjudge::config::KeybindingsConfig) {
        if key.code == KeyCode::Char('f') {
            self.open_text_input(InputTarget::CsvPath, "");
            return;
        }

        let Some(csv) = self.source.csv.as_mut() else {
            return;
        };
        match key.code {
            KeyCode::Down | KeyCode::Char('j') => {
                self.source.focused_column = self.source.focused_column.next();
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.source.focused_column = self.source.focused_column.prev();
            }
            KeyCode::Right => csv.cycle(self.source.focused_column, true),
            KeyCode::Left => csv.cycle(self.source.focused_column, false),
            KeyCode::Char(c) if c == kb.next => csv.cycle(self.source.focused_column, true),
            KeyCode::Char(c) if c == kb.prev => csv.cycle(self.source.focused_column, false),
            _ => {}
        }
    }

    /// Load the CSV at `path` into the setup form.
    pub(crate) fn load_csv(&mut self, path: &str) {
        let path = PathBuf::from(path.trim());
        match CsvSelection::load(&path) {
            Ok(selection) => {
                self.engine.clear_error();
                self.source.csv = Some(selection);
                self.source.focused_column = Default::default();
            }
            Err(e) => self.engine.record_error(e),
        }
    }

    // ── annotation screen ──

    fn handle_annotate_input(&mut self, key: KeyEvent) {
        let kb = self.config.keybindings.clone();

        if let Some(slot) = digit_slot(&key) {
            self.judge_slot(slot);
            return;
        }

        match key.code {
            KeyCode::Char(c) if c == kb.quit => self.should_quit = true,
            KeyCode::Char(c) if c == kb.help => self.open_help(),
            KeyCode::Char(c) if c == kb.next => self.engine.advance(),
            KeyCode::Right => self.engine.advance(),
            KeyCode::Char(c) if c == kb.prev => self.engine.retreat(),
            KeyCode::Left => self.engine.retreat(),
            KeyCode::Tab | KeyCode::Down => self.move_label_cursor(true),
            KeyCode::BackTab | KeyCode::Up => self.move_label_cursor(false),
            KeyCode::Enter | KeyCode::Char(' ') => self.judge_slot(self.selected_label()),
            KeyCode::Char(c) if c == kb.add_label => {
                self.open_text_input(InputTarget::NewLabel, "");
            }
            KeyCode::Char(c) if c == kb.refresh => self.refresh(),
            KeyCode::Char(c) if c == kb.download => self.export(),
            KeyCode::Char(c) if c == kb.reset => {
                if !self.is_resetting() {
                    self.pending_reset_confirm = true;
                }
            }
            KeyCode::Esc => self.engine.clear_error(),
            _ => {}
        }
    }

    // ── help ──

    fn handle_help_input(&mut self, key: KeyEvent) {
        let kb = &self.config.keybindings;
        match key.code {
            KeyCode::Char(c) if c == kb.quit || c == kb.help => {
                self.state = self.previous_state;
            }
            KeyCode::Esc => self.state = self.previous_state,
            KeyCode::Down | KeyCode::Char('j') => {
                self.help_scroll_offset = self.help_scroll_offset.saturating_add(1);
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.help_scroll_offset = self.help_scroll_offset.saturating_sub(1);
            }
            _ => {}
        }
    }

    // ── single-line input ──

    fn handle_text_input(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.close_text_input(),
            KeyCode::Enter => self.submit_text_input(),
            KeyCode::Backspace => self.input.delete_char(),
            KeyCode::Left => self.input.move_left(),
            KeyCode::Right => self.input.move_right(),
            KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.input.clear();
            }
            KeyCode::Char(c) => {
                // Ctrl+文字は入力として扱わない
                if !key.modifiers.contains(KeyModifiers::CONTROL) {
                    self.input.insert_char(c);
                }
            }
            _ => {}
        }
    }

    fn close_text_input(&mut self) {
        self.input_target = None;
        self.input.clear();
        self.state = self.previous_state;
    }

    fn submit_text_input(&mut self) {
        let Some(target) = self.input_target else {
            self.close_text_input();
            return;
        };
        let text = self.input.take();
        self.close_text_input();

        match target {
            InputTarget::Labels => self.labels.set_raw(text),
            InputTarget::NewLabel => {
                if !self.labels.add(&text) && !text.trim().is_empty() {
                    let reason = if text.contains(',') {
                        "Labels cannot contain commas"
                    } else {
                        "Label already exists"
                    };
                    self.set_submission_result(false, reason.to_string());
                }
            }
            InputTarget::CsvPath => {
                if text.trim().is_empty() {
                    self.engine
                        .record_error(SessionError::Input("No CSV path given".to_string()));
                } else {
                    self.load_csv(&text);
                }
            }
        }
    }
}
