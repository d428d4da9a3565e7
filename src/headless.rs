use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use simjudge::session::Session;
use simjudge::store::{write_export, PairsSnapshot, SessionStore};

/// `sj status` の JSON 出力
#[derive(Debug, Serialize)]
pub struct StatusOutput {
    pub total: usize,
    pub judged: usize,
    /// Judged share in whole percent
    pub progress: u32,
    /// Where the annotator resumes
    pub cursor: usize,
    pub export_url: String,
}

pub fn build_status(snapshot: PairsSnapshot, export_url: String) -> Result<StatusOutput> {
    let (pairs, results) = (snapshot.pairs.len(), snapshot.results.len());
    let session = Session::from_snapshot(snapshot).ok_or_else(|| {
        anyhow!(
            "Store returned {} pairs but {} results",
            pairs,
            results
        )
    })?;
    Ok(StatusOutput {
        total: session.len(),
        judged: session.judged_count(),
        progress: session.progress().round() as u32,
        cursor: session.cursor(),
        export_url,
    })
}

/// Print the session summary as JSON on stdout.
pub async fn run_status(store: Arc<dyn SessionStore>) -> Result<()> {
    let snapshot = store
        .fetch_pairs()
        .await
        .context("Failed to fetch pairs")?;
    let output = build_status(snapshot, store.export_url())?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Download the results table into `target` (file or directory).
pub async fn run_export(store: Arc<dyn SessionStore>, target: &Path) -> Result<PathBuf> {
    eprintln!("[Headless] Downloading results from {}...", store.export_url());
    let body = store
        .fetch_export()
        .await
        .context("Failed to download results")?;
    let path = write_export(target, &body)?;
    println!("{}", path.display());
    Ok(path)
}

pub async fn run_reset(store: Arc<dyn SessionStore>) -> Result<()> {
    store.reset().await.context("Failed to reset")?;
    eprintln!("[Headless] Session reset");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use simjudge::store::LocalStore;
    use tempfile::{tempdir, TempDir};

    fn local_store() -> (TempDir, Arc<dyn SessionStore>) {
        let dir = tempdir().unwrap();
        let store = LocalStore::open(&dir.path().join("session.json")).unwrap();
        (dir, Arc::new(store))
    }

    #[test]
    fn test_status_output_partial_session() {
        let snapshot = PairsSnapshot {
            pairs: vec![
                ("cat".to_string(), "feline".to_string()),
                ("dog".to_string(), "canine".to_string()),
                ("car".to_string(), "banana".to_string()),
            ],
            results: vec![Some(json!("True")), None, Some(json!("False"))],
        };
        let output = build_status(snapshot, "file:///tmp/annotation_results.csv".to_string())
            .unwrap();
        insta::assert_json_snapshot!(output, @r#"
        {
          "total": 3,
          "judged": 2,
          "progress": 67,
          "cursor": 1,
          "export_url": "file:///tmp/annotation_results.csv"
        }
        "#);
    }

    #[test]
    fn test_status_output_empty_session() {
        let output = build_status(PairsSnapshot::default(), String::new()).unwrap();
        assert_eq!(output.total, 0);
        assert_eq!(output.progress, 0);
        assert_eq!(output.cursor, 0);
    }

    #[test]
    fn test_status_rejects_misaligned_snapshot() {
        let snapshot = PairsSnapshot {
            pairs: vec![("a".to_string(), "b".to_string())],
            results: vec![],
        };
        assert!(build_status(snapshot, String::new()).is_err());
    }

    #[tokio::test]
    async fn test_run_export_writes_table() {
        let (_dir, store) = local_store();
        store.submit_lists("cat\ndog", "feline\ncanine").await.unwrap();
        store.submit_judgment(1, "False").await.unwrap();
        let out = tempdir().unwrap();
        let target = out.path().join("results.csv");

        let path = run_export(store, &target).await.unwrap();

        assert_eq!(path, target);
        let body = std::fs::read_to_string(path).unwrap();
        assert_eq!(
            body,
            "list1_item,list2_item,judgment\ncat,feline,unjudged\ndog,canine,False\n"
        );
    }

    #[tokio::test]
    async fn test_run_reset_discards_pairs() {
        let (_dir, store) = local_store();
        store.submit_lists("a", "b").await.unwrap();
        run_reset(Arc::clone(&store)).await.unwrap();
        assert!(store.fetch_pairs().await.unwrap().pairs.is_empty());
    }
}
