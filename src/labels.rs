//! アノテーションラベルの管理
//!
//! ラベル集合はカンマ区切りの生文字列として保持し、表示や判定のたびに
//! `parse` で導出する。導出結果はキャッシュしない。

/// 初期ラベル（リセット時もここに戻る）
pub const DEFAULT_LABELS: &str = "True,False";

/// Split a raw comma-separated label string into an ordered, deduplicated list.
///
/// Tokens are trimmed, empty tokens dropped, and only the first occurrence of
/// each label (exact, case-sensitive match) is kept.
pub fn parse(raw: &str) -> Vec<String> {
    let mut labels: Vec<String> = Vec::new();
    for token in raw.split(',') {
        let token = token.trim();
        if token.is_empty() || labels.iter().any(|l| l == token) {
            continue;
        }
        labels.push(token.to_string());
    }
    labels
}

/// Append `new_label` to `raw` unless it is empty, contains a comma, or is
/// already present. Returns `raw` unchanged otherwise.
pub fn add(raw: &str, new_label: &str) -> String {
    let new_label = new_label.trim();
    if new_label.is_empty() || new_label.contains(',') {
        return raw.to_string();
    }
    if parse(raw).iter().any(|l| l == new_label) {
        return raw.to_string();
    }
    if raw.trim().is_empty() {
        new_label.to_string()
    } else {
        format!("{},{}", raw, new_label)
    }
}

/// 生文字列を所有するラベル集合
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelSet {
    raw: String,
}

impl Default for LabelSet {
    fn default() -> Self {
        Self::new(DEFAULT_LABELS)
    }
}

impl LabelSet {
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn set_raw(&mut self, raw: impl Into<String>) {
        self.raw = raw.into();
    }

    /// Current labels in display order.
    pub fn labels(&self) -> Vec<String> {
        parse(&self.raw)
    }

    pub fn is_empty(&self) -> bool {
        self.labels().is_empty()
    }

    /// Label bound to a 0-based shortcut slot (number keys 1-9).
    pub fn get(&self, index: usize) -> Option<String> {
        self.labels().into_iter().nth(index)
    }

    /// Returns `true` if the label was appended.
    pub fn add(&mut self, new_label: &str) -> bool {
        let updated = add(&self.raw, new_label);
        let changed = updated != self.raw;
        self.raw = updated;
        changed
    }

    pub fn reset(&mut self) {
        self.raw = DEFAULT_LABELS.to_string();
    }
}
