/// 画面状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppState {
    /// 入力設定（ラベル・リスト・CSV）
    #[default]
    Setup,
    /// ペア比較中
    Annotating,
    Help,
    /// 1行入力（ラベル追加など）
    TextInput,
}

/// What the single-line input is editing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputTarget {
    /// Replace the raw label string
    Labels,
    /// Append one label
    NewLabel,
    /// Path of the CSV file to load
    CsvPath,
}

impl InputTarget {
    pub fn title(self) -> &'static str {
        match self {
            InputTarget::Labels => "Labels (comma-separated)",
            InputTarget::NewLabel => "New label",
            InputTarget::CsvPath => "CSV file path",
        }
    }
}

/// Which list an editor session fills
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListSlot {
    First,
    Second,
}

impl ListSlot {
    pub fn name(self) -> &'static str {
        match self {
            ListSlot::First => "List 1",
            ListSlot::Second => "List 2",
        }
    }
}

/// リセット確認の選択結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingResetChoice {
    Confirm,
    Cancel,
    Ignore,
}
