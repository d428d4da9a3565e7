use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::SessionError;
use crate::store::{InitRequest, PairsSnapshot, SessionStore, StoreError};

use super::{JudgmentWrite, Session};

/// Annotation session engine.
///
/// Owns the session (present only while comparing), the single-slot error and
/// the in-flight judgment. The async operations compose the synchronous
/// pieces; the TUI drives the pieces itself from background task results.
///
/// Judgment submissions are serialized: while one is in flight,
/// [`Engine::begin_judgment`] refuses new ones.
pub struct Engine {
    store: Arc<dyn SessionStore>,
    session: Option<Session>,
    error: Option<String>,
    pending: Option<JudgmentWrite>,
}

impl Engine {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self {
            store,
            session: None,
            error: None,
            pending: None,
        }
    }

    pub fn store(&self) -> Arc<dyn SessionStore> {
        Arc::clone(&self.store)
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn is_comparing(&self) -> bool {
        self.session.is_some()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    /// Record an error, replacing any previous one.
    pub fn record_error(&mut self, error: SessionError) {
        warn!(%error, "session error");
        self.error = Some(error.to_string());
    }

    pub fn cursor(&self) -> usize {
        self.session.as_ref().map_or(0, Session::cursor)
    }

    pub fn progress(&self) -> f64 {
        self.session.as_ref().map_or(0.0, Session::progress)
    }

    pub fn is_judgment_pending(&self) -> bool {
        self.pending.is_some()
    }

    // ── start / resume ──

    /// Submit the init request, then fetch and enter comparing mode.
    /// Returns `false` if the submission failed.
    pub async fn start(&mut self, request: &InitRequest) -> bool {
        self.clear_error();
        debug!(source = %request.describe(), "starting session");
        if let Err(e) = self.store.submit(request).await {
            self.fail_start(e);
            return false;
        }
        self.resume_fetch().await;
        true
    }

    pub fn fail_start(&mut self, error: StoreError) {
        let action = "Failed to submit input";
        self.record_error(SessionError::transport(action, error));
    }

    /// Fetch pairs and results and position the cursor at the resume point.
    pub async fn resume_fetch(&mut self) {
        self.clear_error();
        let result = self.store.fetch_pairs().await;
        self.apply_fetch(result);
    }

    /// Apply a fetch result. Entering comparing mode happens even when the
    /// fetch fails: the session is then empty and the error is shown.
    pub fn apply_fetch(&mut self, result: Result<PairsSnapshot, StoreError>) {
        let snapshot = match result {
            Ok(snapshot) => snapshot,
            Err(e) => {
                self.record_error(SessionError::transport("Failed to fetch pairs", e));
                self.session.get_or_insert_with(Session::default);
                return;
            }
        };
        let (pairs, results) = (snapshot.pairs.len(), snapshot.results.len());
        match Session::from_snapshot(snapshot) {
            Some(session) => {
                debug!(pairs, cursor = session.cursor(), "session loaded");
                self.pending = None;
                self.session = Some(session);
            }
            None => {
                self.record_error(SessionError::transport(
                    "Failed to fetch pairs",
                    StoreError::Malformed(format!(
                        "received {} pairs but {} results",
                        pairs, results
                    )),
                ));
                self.session.get_or_insert_with(Session::default);
            }
        }
    }

    // ── judge ──

    /// Judge the current pair and commit it to the store.
    pub async fn judge(&mut self, label: &str) {
        let Some((index, label)) = self.begin_judgment(label) else {
            return;
        };
        let result = self.store.submit_judgment(index, &label).await;
        self.complete_judgment(result);
    }

    /// Optimistically write `label` at the cursor.
    ///
    /// Returns the `(index, label)` to submit, or `None` when there is nothing
    /// to judge or another judgment is still in flight.
    pub fn begin_judgment(&mut self, label: &str) -> Option<(usize, String)> {
        if self.pending.is_some() {
            debug!("judgment ignored: submission in flight");
            return None;
        }
        let session = self.session.as_mut()?;
        let write = JudgmentWrite::apply(session, label)?;
        self.error = None;
        let request = (write.index(), write.label().to_string());
        self.pending = Some(write);
        Some(request)
    }

    /// Finish the in-flight judgment: advance on success, roll back on failure.
    pub fn complete_judgment(&mut self, result: Result<(), StoreError>) {
        let Some(write) = self.pending.take() else {
            return;
        };
        let Some(session) = self.session.as_mut() else {
            return;
        };
        match result {
            Ok(()) => {
                debug!(index = write.index(), label = write.label(), "judgment saved");
                session.advance();
            }
            Err(e) => {
                write.rollback(session);
                self.record_error(SessionError::transport("Failed to save judgment", e));
            }
        }
    }

    // ── navigation ──

    pub fn advance(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.advance();
        }
    }

    pub fn retreat(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.retreat();
        }
    }

    // ── reset ──

    /// Discard the session in the store, then locally.
    /// Returns `true` if the session was discarded.
    pub async fn reset(&mut self) -> bool {
        self.clear_error();
        let result = self.store.reset().await;
        self.apply_reset(result)
    }

    /// Local state is only discarded once the store confirmed the reset.
    pub fn apply_reset(&mut self, result: Result<(), StoreError>) -> bool {
        match result {
            Ok(()) => {
                debug!("session reset");
                self.session = None;
                self.pending = None;
                true
            }
            Err(e) => {
                self.record_error(SessionError::transport("Failed to reset", e));
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{CsvUpload, LocalStore};
    use async_trait::async_trait;
    use serde_json::Value;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;
    use tempfile::{tempdir, TempDir};

    /// Store with canned pairs whose calls can be made to fail.
    #[derive(Default)]
    struct ScriptedStore {
        snapshot: Mutex<PairsSnapshot>,
        fail_submit: AtomicBool,
        fail_fetch: AtomicBool,
        fail_judgment: AtomicBool,
        fail_reset: AtomicBool,
        submitted: Mutex<Vec<(usize, String)>>,
    }

    impl ScriptedStore {
        fn with_results(results: Vec<Option<&str>>) -> Self {
            let store = Self::default();
            *store.snapshot.lock().unwrap() = PairsSnapshot {
                pairs: (0..results.len())
                    .map(|i| (format!("left{}", i), format!("right{}", i)))
                    .collect(),
                results: results
                    .into_iter()
                    .map(|r| r.map(|s| Value::String(s.to_string())))
                    .collect(),
            };
            store
        }

        fn failure() -> StoreError {
            StoreError::Status {
                endpoint: "/test".to_string(),
                status: 500,
                body: "boom".to_string(),
            }
        }

        fn check(flag: &AtomicBool) -> Result<(), StoreError> {
            if flag.load(Ordering::SeqCst) {
                Err(Self::failure())
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl SessionStore for ScriptedStore {
        async fn submit_lists(&self, _: &str, _: &str) -> Result<(), StoreError> {
            Self::check(&self.fail_submit)
        }

        async fn submit_csv(&self, _: &CsvUpload) -> Result<(), StoreError> {
            Self::check(&self.fail_submit)
        }

        async fn fetch_pairs(&self) -> Result<PairsSnapshot, StoreError> {
            Self::check(&self.fail_fetch)?;
            Ok(self.snapshot.lock().unwrap().clone())
        }

        async fn submit_judgment(&self, index: usize, judgment: &str) -> Result<(), StoreError> {
            Self::check(&self.fail_judgment)?;
            self.submitted
                .lock()
                .unwrap()
                .push((index, judgment.to_string()));
            Ok(())
        }

        async fn reset(&self) -> Result<(), StoreError> {
            Self::check(&self.fail_reset)
        }

        fn export_url(&self) -> String {
            "memory://results.csv".to_string()
        }

        async fn fetch_export(&self) -> Result<String, StoreError> {
            Ok(String::new())
        }
    }

    fn lists() -> InitRequest {
        InitRequest::Lists {
            list1: "cat\ndog".to_string(),
            list2: "feline\ncanine".to_string(),
        }
    }

    fn local_engine() -> (Engine, TempDir) {
        let dir = tempdir().unwrap();
        let store = LocalStore::open(&dir.path().join("session.json")).unwrap();
        (Engine::new(Arc::new(store)), dir)
    }

    async fn scripted_engine(results: Vec<Option<&str>>) -> (Engine, Arc<ScriptedStore>) {
        let store = Arc::new(ScriptedStore::with_results(results));
        let mut engine = Engine::new(store.clone());
        assert!(engine.start(&lists()).await);
        (engine, store)
    }

    #[tokio::test]
    async fn test_end_to_end_lists_session() {
        let (mut engine, _dir) = local_engine();
        assert!(!engine.is_comparing());

        assert!(engine.start(&lists()).await);
        assert!(engine.is_comparing());
        let session = engine.session().unwrap();
        assert_eq!(
            session.pairs(),
            &[
                ("cat".to_string(), "feline".to_string()),
                ("dog".to_string(), "canine".to_string())
            ]
        );
        assert_eq!(session.results(), &[None, None]);
        assert_eq!(engine.cursor(), 0);

        engine.judge("True").await;
        let session = engine.session().unwrap();
        assert_eq!(session.results(), &[Some("True".to_string()), None]);
        assert_eq!(engine.cursor(), 1);
        assert!(engine.error().is_none());
    }

    #[tokio::test]
    async fn test_resume_after_restart_lands_on_first_gap() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");
        {
            let store = LocalStore::open(&path).unwrap();
            let mut engine = Engine::new(Arc::new(store));
            let request = InitRequest::Lists {
                list1: "a\nb\nc\nd".to_string(),
                list2: "w\nx\ny\nz".to_string(),
            };
            assert!(engine.start(&request).await);
            engine.judge("True").await;
            engine.advance();
            engine.judge("False").await;
        }

        let store = LocalStore::open(&path).unwrap();
        let mut engine = Engine::new(Arc::new(store));
        engine.resume_fetch().await;
        // [True, null, False, null]
        assert_eq!(engine.cursor(), 1);
        assert_eq!(engine.progress(), 50.0);
    }

    #[tokio::test]
    async fn test_start_submit_failure_creates_no_session() {
        let store = Arc::new(ScriptedStore::with_results(vec![None]));
        store.fail_submit.store(true, Ordering::SeqCst);
        let mut engine = Engine::new(store);

        assert!(!engine.start(&lists()).await);
        assert!(!engine.is_comparing());
        assert!(engine.error().unwrap().starts_with("Failed to submit input"));
    }

    #[tokio::test]
    async fn test_start_fetch_failure_enters_empty_session() {
        let store = Arc::new(ScriptedStore::with_results(vec![None]));
        store.fail_fetch.store(true, Ordering::SeqCst);
        let mut engine = Engine::new(store.clone());

        assert!(engine.start(&lists()).await);
        assert!(engine.is_comparing());
        assert!(engine.session().unwrap().is_empty());
        assert!(engine.error().unwrap().starts_with("Failed to fetch pairs"));

        // Refresh after the store recovers
        store.fail_fetch.store(false, Ordering::SeqCst);
        engine.resume_fetch().await;
        assert_eq!(engine.session().unwrap().len(), 1);
        assert!(engine.error().is_none());
    }

    #[tokio::test]
    async fn test_resume_rules_from_store() {
        let (engine, _) =
            scripted_engine(vec![Some("L"), None, Some("L"), None]).await;
        assert_eq!(engine.cursor(), 1);

        let (engine, _) = scripted_engine(vec![Some("L"), Some("L")]).await;
        assert_eq!(engine.cursor(), 1);

        let (engine, _) = scripted_engine(vec![]).await;
        assert_eq!(engine.cursor(), 0);
        assert_eq!(engine.progress(), 0.0);
    }

    #[tokio::test]
    async fn test_failed_judgment_rolls_back_to_unjudged() {
        let (mut engine, store) = scripted_engine(vec![None, None]).await;
        store.fail_judgment.store(true, Ordering::SeqCst);

        engine.judge("True").await;
        let session = engine.session().unwrap();
        assert_eq!(session.results(), &[None, None]);
        assert_eq!(engine.cursor(), 0);
        assert!(engine.error().unwrap().starts_with("Failed to save judgment"));
        assert!(!engine.is_judgment_pending());
    }

    #[tokio::test]
    async fn test_failed_rejudgment_preserves_prior_label() {
        let (mut engine, store) = scripted_engine(vec![Some("False"), None]).await;
        engine.retreat();
        assert_eq!(engine.cursor(), 0);
        store.fail_judgment.store(true, Ordering::SeqCst);

        engine.judge("True").await;
        assert_eq!(engine.session().unwrap().judgment(0), Some("False"));
        assert_eq!(engine.cursor(), 0);
    }

    #[tokio::test]
    async fn test_optimistic_write_is_visible_before_commit() {
        let (mut engine, _) = scripted_engine(vec![None, None]).await;
        let request = engine.begin_judgment("True");
        assert_eq!(request, Some((0, "True".to_string())));
        assert_eq!(engine.session().unwrap().current_judgment(), Some("True"));
        assert!(engine.is_judgment_pending());

        // Serialized: a second judgment is refused while one is in flight
        assert_eq!(engine.begin_judgment("False"), None);
        assert_eq!(engine.session().unwrap().current_judgment(), Some("True"));

        engine.complete_judgment(Ok(()));
        assert_eq!(engine.cursor(), 1);
        assert!(!engine.is_judgment_pending());
    }

    #[tokio::test]
    async fn test_rollback_after_navigation_restores_judged_slot() {
        let (mut engine, _) = scripted_engine(vec![None, None, None]).await;
        engine.begin_judgment("True").unwrap();
        engine.advance();
        engine.advance();

        engine.complete_judgment(Err(ScriptedStore::failure()));
        let session = engine.session().unwrap();
        assert_eq!(session.results(), &[None, None, None]);
        assert_eq!(session.cursor(), 2);
    }

    #[tokio::test]
    async fn test_judge_at_last_pair_stays_there() {
        let (mut engine, store) = scripted_engine(vec![Some("A"), None]).await;
        assert_eq!(engine.cursor(), 1);
        engine.judge("B").await;
        assert_eq!(engine.cursor(), 1);
        assert_eq!(engine.progress(), 100.0);
        assert_eq!(*store.submitted.lock().unwrap(), vec![(1, "B".to_string())]);
    }

    #[tokio::test]
    async fn test_judge_without_session_is_noop() {
        let store = Arc::new(ScriptedStore::default());
        let mut engine = Engine::new(store.clone());
        engine.judge("True").await;
        assert!(store.submitted.lock().unwrap().is_empty());
        assert!(engine.error().is_none());
    }

    #[tokio::test]
    async fn test_navigation_bounds_through_engine() {
        let (mut engine, _) = scripted_engine(vec![None, None]).await;
        engine.retreat();
        assert_eq!(engine.cursor(), 0);
        engine.advance();
        engine.advance();
        assert_eq!(engine.cursor(), 1);
    }

    #[tokio::test]
    async fn test_reset_failure_keeps_session() {
        let (mut engine, store) = scripted_engine(vec![Some("True"), None]).await;
        store.fail_reset.store(true, Ordering::SeqCst);

        assert!(!engine.reset().await);
        assert!(engine.is_comparing());
        assert_eq!(engine.session().unwrap().judgment(0), Some("True"));
        assert!(engine.error().unwrap().starts_with("Failed to reset"));
    }

    #[tokio::test]
    async fn test_reset_success_destroys_session() {
        let (mut engine, _) = scripted_engine(vec![None]).await;
        assert!(engine.reset().await);
        assert!(!engine.is_comparing());
        assert_eq!(engine.cursor(), 0);
        assert_eq!(engine.progress(), 0.0);
    }

    #[tokio::test]
    async fn test_latest_error_wins() {
        let (mut engine, store) = scripted_engine(vec![None]).await;
        store.fail_judgment.store(true, Ordering::SeqCst);
        engine.judge("True").await;
        assert!(engine.error().unwrap().starts_with("Failed to save judgment"));

        store.fail_reset.store(true, Ordering::SeqCst);
        engine.reset().await;
        assert!(engine.error().unwrap().starts_with("Failed to reset"));
    }

    #[tokio::test]
    async fn test_misaligned_snapshot_is_rejected() {
        let store = Arc::new(ScriptedStore::with_results(vec![None, None]));
        store.snapshot.lock().unwrap().results.pop();
        let mut engine = Engine::new(store);
        engine.resume_fetch().await;
        assert!(engine.session().unwrap().is_empty());
        assert!(engine.error().is_some());
    }
}
