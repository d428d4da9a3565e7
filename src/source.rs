//! 入力ソース（テキストリスト / CSV）から初期化リクエストを組み立てる
//!
//! ペアの生成自体はストア側の責務。ここでは入力の検証とカラム選択のみ扱う。

use std::fs;
use std::path::Path;

use crate::error::SessionError;
use crate::labels::LabelSet;
use crate::store::{CsvUpload, InitRequest};

/// Anything that can produce a session init request.
pub trait PairSource {
    /// The request to submit, or `None` while the input is incomplete.
    fn init_request(&self) -> Option<InitRequest>;

    fn is_ready(&self) -> bool {
        self.init_request().is_some()
    }
}

/// Labels must be non-empty and the source ready.
pub fn can_start(labels: &LabelSet, source: &dyn PairSource) -> bool {
    !labels.is_empty() && source.is_ready()
}

/// Two raw newline-delimited lists, forwarded verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextLists {
    pub list1: String,
    pub list2: String,
}

impl TextLists {
    pub fn new(list1: impl Into<String>, list2: impl Into<String>) -> Self {
        Self {
            list1: list1.into(),
            list2: list2.into(),
        }
    }

    /// Number of non-blank lines in each list (for display only).
    pub fn line_counts(&self) -> (usize, usize) {
        let count = |s: &str| s.lines().filter(|l| !l.trim().is_empty()).count();
        (count(&self.list1), count(&self.list2))
    }
}

impl PairSource for TextLists {
    fn init_request(&self) -> Option<InitRequest> {
        if self.list1.trim().is_empty() || self.list2.trim().is_empty() {
            return None;
        }
        Some(InitRequest::Lists {
            list1: self.list1.clone(),
            list2: self.list2.clone(),
        })
    }
}

/// Which column selector is being changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColumnField {
    #[default]
    Column1,
    Column2,
    Annotation,
}

impl ColumnField {
    pub fn next(self) -> Self {
        match self {
            ColumnField::Column1 => ColumnField::Column2,
            ColumnField::Column2 => ColumnField::Annotation,
            ColumnField::Annotation => ColumnField::Annotation,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            ColumnField::Column1 => ColumnField::Column1,
            ColumnField::Column2 => ColumnField::Column1,
            ColumnField::Annotation => ColumnField::Column2,
        }
    }
}

/// A parsed CSV file plus the selected columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvSelection {
    pub file_name: String,
    bytes: Vec<u8>,
    headers: Vec<String>,
    row_count: usize,
    pub column1: String,
    pub column2: String,
    /// `None` = do not seed judgments
    pub annotation_column: Option<String>,
}

impl CsvSelection {
    /// Read and parse a CSV file from disk.
    pub fn load(path: &Path) -> Result<Self, SessionError> {
        let bytes = fs::read(path).map_err(|e| {
            SessionError::Input(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "upload.csv".to_string());
        Self::from_bytes(file_name, bytes)
    }

    /// Parse the header row and check every record is readable.
    ///
    /// Columns default to the first, second and third header fields.
    pub fn from_bytes(file_name: String, bytes: Vec<u8>) -> Result<Self, SessionError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(bytes.as_slice());
        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| SessionError::Parse(e.to_string()))?
            .iter()
            .map(String::from)
            .collect();
        if headers.iter().all(|h| h.trim().is_empty()) {
            return Err(SessionError::Parse(format!("{} has no header row", file_name)));
        }

        let mut row_count = 0;
        for record in reader.records() {
            record.map_err(|e| SessionError::Parse(e.to_string()))?;
            row_count += 1;
        }

        let column1 = headers.first().cloned().unwrap_or_default();
        let column2 = headers.get(1).cloned().unwrap_or_default();
        let annotation_column = headers.get(2).cloned();

        Ok(Self {
            file_name,
            bytes,
            headers,
            row_count,
            column1,
            column2,
            annotation_column,
        })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn value(&self, field: ColumnField) -> Option<&str> {
        match field {
            ColumnField::Column1 => Some(self.column1.as_str()),
            ColumnField::Column2 => Some(self.column2.as_str()),
            ColumnField::Annotation => self.annotation_column.as_deref(),
        }
    }

    /// Select a column by header name. Unknown names are ignored.
    pub fn select(&mut self, field: ColumnField, name: &str) -> bool {
        if !self.headers.iter().any(|h| h == name) {
            return false;
        }
        match field {
            ColumnField::Column1 => self.column1 = name.to_string(),
            ColumnField::Column2 => self.column2 = name.to_string(),
            ColumnField::Annotation => self.annotation_column = Some(name.to_string()),
        }
        true
    }

    /// Step the selection for `field` through the headers.
    ///
    /// The annotation column cycle includes "none" before the first header.
    pub fn cycle(&mut self, field: ColumnField, forward: bool) {
        let len = self.headers.len();
        if len == 0 {
            return;
        }
        let current = self
            .value(field)
            .and_then(|v| self.headers.iter().position(|h| h == v));

        match field {
            ColumnField::Annotation => {
                // 0 = none, 1..=len = headers
                let slots = len + 1;
                let pos = current.map_or(0, |i| i + 1);
                let next = if forward {
                    (pos + 1) % slots
                } else {
                    (pos + slots - 1) % slots
                };
                self.annotation_column = next.checked_sub(1).map(|i| self.headers[i].clone());
            }
            _ => {
                let pos = current.unwrap_or(0);
                let next = if forward {
                    (pos + 1) % len
                } else {
                    (pos + len - 1) % len
                };
                let name = self.headers[next].clone();
                self.select(field, &name);
            }
        }
    }
}

impl PairSource for CsvSelection {
    fn init_request(&self) -> Option<InitRequest> {
        Some(InitRequest::Csv(CsvUpload {
            file_name: self.file_name.clone(),
            bytes: self.bytes.clone(),
            column1: self.column1.clone(),
            column2: self.column2.clone(),
            annotation_column: self.annotation_column.clone(),
        }))
    }
}

/// 入力モード
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMode {
    #[default]
    Text,
    Csv,
}

impl InputMode {
    pub fn toggle(self) -> Self {
        match self {
            InputMode::Text => InputMode::Csv,
            InputMode::Csv => InputMode::Text,
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            InputMode::Text => "Text lists",
            InputMode::Csv => "CSV upload",
        }
    }
}

/// Input configuration edited on the setup screen.
#[derive(Debug, Clone, Default)]
pub struct SourceConfig {
    pub mode: InputMode,
    pub text: TextLists,
    pub csv: Option<CsvSelection>,
    pub focused_column: ColumnField,
}

impl SourceConfig {
    /// The source for the active mode.
    pub fn active(&self) -> Option<&dyn PairSource> {
        match self.mode {
            InputMode::Text => Some(&self.text),
            InputMode::Csv => self.csv.as_ref().map(|c| c as &dyn PairSource),
        }
    }

    pub fn init_request(&self) -> Option<InitRequest> {
        self.active().and_then(PairSource::init_request)
    }

    pub fn can_start(&self, labels: &LabelSet) -> bool {
        self.active().is_some_and(|source| can_start(labels, source))
    }
}
