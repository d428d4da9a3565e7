use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use simjudge::config::config_path;

/// Default config.toml content
const DEFAULT_CONFIG: &str = r#"# Editor for entering item lists.
# Resolved in order: this value → $VISUAL → $EDITOR → vi
# Supports arguments: editor = "code --wait"
# editor = "vim"

# Comma-separated labels offered when a session starts
labels = "True,False"

[store]
# "local" keeps the session in a JSON file, "http" talks to an annotation server
backend = "local"
url = "http://localhost:8000"
timeout_secs = 10
# path = "/path/to/session.json"  # Optional: local session file

[export]
# Directory (or file path) the results table is downloaded to
dir = "."

[keybindings]
next = 'l'
prev = 'h'
add_label = 'a'
refresh = 'R'
reset = 'X'
download = 'd'
edit_labels = 'e'
help = '?'
quit = 'q'
"#;

/// Run the init command
pub fn run_init(force: bool) -> Result<()> {
    let path = config_path();
    write_config(&path, force)?;
    println!();
    println!("Initialization complete!");
    println!("Edit {} to customize labels, store and keys.", path.display());
    Ok(())
}

/// Write the default config unless it exists (or `force` is set).
/// Returns `true` if the file was written.
fn write_config(path: &Path, force: bool) -> Result<bool> {
    if path.exists() && !force {
        println!(
            "Skipping {} (already exists, use --force to overwrite)",
            path.display()
        );
        return Ok(false);
    }

    if let Some(dir) = path.parent().filter(|d| !d.exists()) {
        println!("Creating configuration directory: {}", dir.display());
        fs::create_dir_all(dir).context("Failed to create config directory")?;
    }

    println!("Writing {}...", path.display());
    fs::write(path, DEFAULT_CONFIG).context("Failed to write config.toml")?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use simjudge::config::Config;
    use simjudge::store::Backend;
    use tempfile::TempDir;

    #[test]
    fn test_write_config_creates_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("simjudge/config.toml");

        assert!(write_config(&path, false).unwrap());

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("# editor = \"vim\""));
        assert!(content.contains("[store]"));
    }

    #[test]
    fn test_default_config_parses_to_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        write_config(&path, false).unwrap();

        let config = Config::load(Some(&path)).unwrap();
        let defaults = Config::default();
        assert_eq!(config.labels, defaults.labels);
        assert_eq!(config.store.backend, Backend::Local);
        assert_eq!(config.store.url, defaults.store.url);
        assert_eq!(config.keybindings.reset, defaults.keybindings.reset);
    }

    #[test]
    fn test_write_config_skips_existing() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "labels = \"A,B\"").unwrap();

        assert!(!write_config(&path, false).unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), "labels = \"A,B\"");
    }

    #[test]
    fn test_write_config_force_overwrites() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "labels = \"A,B\"").unwrap();

        assert!(write_config(&path, true).unwrap());
        assert!(fs::read_to_string(&path).unwrap().contains("[keybindings]"));
    }
}
