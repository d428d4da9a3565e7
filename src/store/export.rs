use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use super::StoreError;

/// Default download file name
pub const EXPORT_FILE_NAME: &str = "annotation_results.csv";

/// Judgment cell for pairs nobody has judged yet
pub const UNJUDGED_MARKER: &str = "unjudged";

const HEADER: [&str; 3] = ["list1_item", "list2_item", "judgment"];

/// Render the results table, one row per pair.
pub fn render_table(
    pairs: &[(String, String)],
    results: &[Option<String>],
) -> Result<String, StoreError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(HEADER)?;
    for (i, (item1, item2)) in pairs.iter().enumerate() {
        let judgment = results
            .get(i)
            .and_then(|r| r.as_deref())
            .unwrap_or(UNJUDGED_MARKER);
        writer.write_record([item1.as_str(), item2.as_str(), judgment])?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| StoreError::Io(e.into_error()))?;
    String::from_utf8(bytes).map_err(|e| StoreError::Malformed(e.to_string()))
}

/// Write an export body into `target`.
///
/// A directory target receives [`EXPORT_FILE_NAME`]; anything else is used as
/// the file path as-is.
pub fn write_export(target: &Path, body: &str) -> Result<PathBuf> {
    let path = if target.is_dir() {
        target.join(EXPORT_FILE_NAME)
    } else {
        target.to_path_buf()
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    fs::write(&path, body).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}
