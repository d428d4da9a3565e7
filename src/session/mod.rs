//! Annotation session state: pairs, judgments and the cursor.

mod engine;

pub use engine::Engine;

use serde_json::Value;

use crate::store::PairsSnapshot;

/// One comparison unit, identified by its index in the session.
pub type Pair = (String, String);

/// A pair's label, or `None` while unjudged.
pub type Judgment = Option<String>;

/// Normalize a raw store result: `null` and `""` are unjudged, strings are
/// kept, anything else is coerced to its string form.
pub fn normalize_judgment(raw: Option<&Value>) -> Judgment {
    match raw {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.is_empty() => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => Some(other.to_string()),
    }
}

/// Where to resume: the earliest unjudged pair, else the last pair, else 0.
pub fn resume_cursor(results: &[Judgment]) -> usize {
    match results.iter().position(Option::is_none) {
        Some(first_unjudged) => first_unjudged,
        None => results.len().saturating_sub(1),
    }
}

/// In-memory session. `pairs` and `results` are index-aligned.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pairs: Vec<Pair>,
    results: Vec<Judgment>,
    cursor: usize,
}

impl Session {
    /// Build a session from a fetched snapshot, positioned at the resume cursor.
    ///
    /// Returns `None` when the snapshot's pairs and results are not aligned.
    pub fn from_snapshot(snapshot: PairsSnapshot) -> Option<Self> {
        if snapshot.pairs.len() != snapshot.results.len() {
            return None;
        }
        let results: Vec<Judgment> = snapshot
            .results
            .iter()
            .map(|r| normalize_judgment(r.as_ref()))
            .collect();
        let cursor = resume_cursor(&results);
        Some(Self {
            pairs: snapshot.pairs,
            results,
            cursor,
        })
    }

    pub fn pairs(&self) -> &[Pair] {
        &self.pairs
    }

    pub fn results(&self) -> &[Judgment] {
        &self.results
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn current_pair(&self) -> Option<&Pair> {
        self.pairs.get(self.cursor)
    }

    pub fn current_judgment(&self) -> Option<&str> {
        self.results.get(self.cursor).and_then(|r| r.as_deref())
    }

    pub fn judgment(&self, index: usize) -> Option<&str> {
        self.results.get(index).and_then(|r| r.as_deref())
    }

    pub fn judged_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_some()).count()
    }

    /// Percentage of judged pairs (0 for an empty session).
    pub fn progress(&self) -> f64 {
        if self.pairs.is_empty() {
            return 0.0;
        }
        100.0 * self.judged_count() as f64 / self.pairs.len() as f64
    }

    pub fn advance(&mut self) {
        self.cursor = (self.cursor + 1).min(self.pairs.len().saturating_sub(1));
    }

    pub fn retreat(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn is_at_start(&self) -> bool {
        self.cursor == 0
    }

    pub fn is_at_end(&self) -> bool {
        self.cursor + 1 >= self.pairs.len()
    }
}

/// Optimistic write of one judgment together with its compensating action.
///
/// `apply` captures the slot's value before writing; `rollback` restores it at
/// the captured index regardless of where the cursor has moved since.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JudgmentWrite {
    index: usize,
    label: String,
    previous: Judgment,
}

impl JudgmentWrite {
    /// Write `label` at the cursor. Returns `None` for an empty session.
    pub fn apply(session: &mut Session, label: &str) -> Option<Self> {
        let index = session.cursor;
        let slot = session.results.get_mut(index)?;
        let previous = slot.replace(label.to_string());
        Some(Self {
            index,
            label: label.to_string(),
            previous,
        })
    }

    pub fn rollback(self, session: &mut Session) {
        if let Some(slot) = session.results.get_mut(self.index) {
            *slot = self.previous;
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}
