use anyhow::{anyhow, Context, Result};
use std::env;
use std::fs;
use std::process::{Command, ExitStatus};
use tempfile::NamedTempFile;

/// Lines starting with this marker are hints and never part of a list.
const HINT_MARKER: &str = "<!--";

/// Editor program plus its leading arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
struct EditorCommand {
    program: String,
    args: Vec<String>,
}

impl EditorCommand {
    fn parse(raw: &str) -> Result<Option<Self>> {
        let mut parts = shell_words::split(raw)
            .with_context(|| format!("Invalid editor command: {}", raw))?
            .into_iter();
        Ok(parts.next().map(|program| Self {
            program,
            args: parts.collect(),
        }))
    }

    fn is_installed(&self) -> bool {
        which::which(&self.program).is_ok()
    }

    /// Pick the first installed candidate (config → $VISUAL → $EDITOR → vi).
    ///
    /// When nothing is installed the first candidate is returned so that
    /// launching it reports which editor was expected.
    fn resolve(configured: Option<&str>) -> Result<Self> {
        let mut first = None;
        let mut missing = Vec::new();

        for raw in candidates(configured) {
            let Some(command) = Self::parse(&raw)? else {
                continue;
            };
            if command.is_installed() {
                if !missing.is_empty() {
                    tracing::warn!(
                        missing = ?missing,
                        editor = %command.program,
                        "editor not found in PATH, using fallback"
                    );
                }
                return Ok(command);
            }
            missing.push(command.program.clone());
            if first.is_none() {
                first = Some(command);
            }
        }

        Ok(first.unwrap_or_else(|| Self {
            program: "vi".to_string(),
            args: Vec::new(),
        }))
    }

    fn run(&self, file: &std::path::Path) -> Result<ExitStatus> {
        Command::new(&self.program)
            .args(&self.args)
            .arg(file)
            .status()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    anyhow!(
                        "Editor '{}' not found (also checked $VISUAL and $EDITOR). \
                         Set 'editor' in ~/.config/simjudge/config.toml to an installed editor.",
                        self.program
                    )
                } else {
                    anyhow!("Failed to launch editor '{}': {}", self.program, e)
                }
            })
    }
}

/// Editor commands in priority order. Blank values are skipped.
fn candidates(configured: Option<&str>) -> Vec<String> {
    let visual = env::var("VISUAL").ok();
    let editor = env::var("EDITOR").ok();
    [configured.map(String::from), visual, editor]
        .into_iter()
        .flatten()
        .filter(|s| !s.trim().is_empty())
        .chain(std::iter::once("vi".to_string()))
        .collect()
}

/// Buffer handed to the editor: hint lines, then the current items.
fn list_buffer(list_name: &str, initial: &str) -> String {
    let mut buffer = format!(
        "{m} simjudge: {name} -->\n\
         {m} One item per line. Blank lines are ignored. -->\n\
         {m} Save and close to apply, delete all items to cancel -->\n",
        m = HINT_MARKER,
        name = list_name
    );
    let items = initial.trim_end_matches('\n');
    if !items.is_empty() {
        buffer.push_str(items);
        buffer.push('\n');
    }
    buffer
}

/// Strip hint lines from an edited buffer.
fn strip_hints(content: &str) -> String {
    content
        .lines()
        .filter(|line| !line.trim_start().starts_with(HINT_MARKER))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Open the external editor on one item list.
///
/// Returns `None` when the editor exits with failure or every item was
/// deleted; the caller keeps the previous list in that case.
pub fn open_list_editor(
    editor: Option<&str>,
    list_name: &str,
    initial: &str,
) -> Result<Option<String>> {
    let file = NamedTempFile::new()?;
    fs::write(file.path(), list_buffer(list_name, initial))
        .context("Failed to write editor buffer")?;

    let command = EditorCommand::resolve(editor)?;
    if !command.run(file.path())?.success() {
        return Ok(None);
    }

    let content = fs::read_to_string(file.path()).context("Failed to read editor buffer")?;
    let items = strip_hints(&content);
    Ok((!items.trim().is_empty()).then_some(items))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    /// Sets editor variables for one test and restores them on drop.
    struct EnvGuard {
        saved: Vec<(&'static str, Option<String>)>,
    }

    impl EnvGuard {
        fn set(vars: &[(&'static str, Option<&str>)]) -> Self {
            let saved = vars
                .iter()
                .map(|(key, value)| {
                    let old = env::var(key).ok();
                    match value {
                        Some(v) => env::set_var(key, v),
                        None => env::remove_var(key),
                    }
                    (*key, old)
                })
                .collect();
            Self { saved }
        }

        fn editors(visual: Option<&str>, editor: Option<&str>) -> Self {
            Self::set(&[("VISUAL", visual), ("EDITOR", editor)])
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for (key, value) in &self.saved {
                match value {
                    Some(v) => env::set_var(key, v),
                    None => env::remove_var(key),
                }
            }
        }
    }

    fn command(program: &str) -> EditorCommand {
        EditorCommand {
            program: program.to_string(),
            args: Vec::new(),
        }
    }

    // ── candidates ──

    #[test]
    #[serial]
    fn test_candidates_without_anything_is_vi() {
        let _guard = EnvGuard::editors(None, None);
        assert_eq!(candidates(None), vec!["vi"]);
        assert_eq!(candidates(Some("")), vec!["vi"]);
        assert_eq!(candidates(Some("   ")), vec!["vi"]);
    }

    #[test]
    #[serial]
    fn test_candidates_priority_order() {
        let _guard = EnvGuard::editors(Some("code --wait"), Some("vim"));
        assert_eq!(candidates(None), vec!["code --wait", "vim", "vi"]);
        assert_eq!(candidates(Some("hx")), vec!["hx", "code --wait", "vim", "vi"]);
    }

    #[test]
    #[serial]
    fn test_candidates_blank_env_is_skipped() {
        let _guard = EnvGuard::editors(Some(" "), Some("nano"));
        assert_eq!(candidates(None), vec!["nano", "vi"]);
    }

    // ── parse / resolve ──

    #[test]
    fn test_parse_splits_quoted_arguments() {
        let parsed = EditorCommand::parse(r#"emacsclient -c -a """#).unwrap().unwrap();
        assert_eq!(parsed.program, "emacsclient");
        assert_eq!(parsed.args, vec!["-c", "-a", ""]);
        assert_eq!(EditorCommand::parse("   ").unwrap(), None);
        assert!(EditorCommand::parse("vim 'unterminated").is_err());
    }

    #[test]
    #[serial]
    fn test_resolve_skips_missing_editor() {
        let _guard = EnvGuard::editors(None, Some("sh"));
        // Arguments of the missing editor are not carried over
        let resolved = EditorCommand::resolve(Some("__nonexistent__ --flag")).unwrap();
        assert_eq!(resolved, command("sh"));
    }

    #[test]
    #[serial]
    fn test_resolve_returns_first_when_nothing_installed() {
        let empty_dir = tempfile::tempdir().unwrap();
        let path = empty_dir.path().display().to_string();
        let _guard = EnvGuard::set(&[
            ("VISUAL", Some("__missing_visual__")),
            ("EDITOR", None),
            ("PATH", Some(path.as_str())),
        ]);
        let resolved = EditorCommand::resolve(Some("__missing_config__")).unwrap();
        assert_eq!(resolved.program, "__missing_config__");
    }

    #[test]
    fn test_run_missing_editor_explains_config() {
        let err = command("__simjudge_nonexistent_editor__")
            .run(std::path::Path::new("list.txt"))
            .unwrap_err()
            .to_string();
        assert!(err.contains("not found"), "got: {}", err);
        assert!(err.contains("$VISUAL") && err.contains("config.toml"));
    }

    // ── buffer ──

    #[test]
    fn test_list_buffer_round_trips_items() {
        let buffer = list_buffer("List 1", "cat\ndog\n\n");
        assert!(buffer.starts_with("<!-- simjudge: List 1 -->"));
        assert!(buffer.ends_with("cat\ndog\n"));
        assert_eq!(strip_hints(&buffer), "cat\ndog");
    }

    #[test]
    fn test_strip_hints_keeps_blank_item_lines() {
        let content = "<!-- simjudge: List 1 -->\n  <!-- hint -->\ncat\n\ndog";
        assert_eq!(strip_hints(content), "cat\n\ndog");
    }

    // ── open_list_editor ──

    #[test]
    #[serial]
    fn test_open_list_editor_returns_edited_list() {
        let script = r#"sh -c 'printf "dog\n" >> "$0"'"#;
        let edited = open_list_editor(Some(script), "List 1", "cat").unwrap();
        assert_eq!(edited.as_deref(), Some("cat\ndog"));
    }

    #[test]
    #[serial]
    fn test_open_list_editor_failed_editor_cancels() {
        let edited = open_list_editor(Some("sh -c 'exit 1'"), "List 1", "cat").unwrap();
        assert_eq!(edited, None);
    }

    #[test]
    #[serial]
    fn test_open_list_editor_cleared_buffer_cancels() {
        let edited = open_list_editor(Some(r#"sh -c ': > "$0"'"#), "List 2", "cat").unwrap();
        assert_eq!(edited, None);
    }
}
