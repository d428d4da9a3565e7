use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

mod app;
mod editor;
mod headless;
mod init;
mod loader;
mod ui;

use simjudge::config::{self, Config};
use simjudge::labels::LabelSet;
use simjudge::source::{ColumnField, CsvSelection, InputMode, SourceConfig, TextLists};
use simjudge::store::{self, Backend};

/// Environment variable that enables the debug log (an EnvFilter directive)
const LOG_ENV: &str = "SIMJUDGE_LOG";

#[derive(Parser, Debug)]
#[command(name = "sj")]
#[command(about = "TUI for pairwise semantic-similarity annotation of two item lists")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Config file (default: ~/.config/simjudge/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Session store backend
    #[arg(long, global = true, value_enum)]
    backend: Option<Backend>,

    /// Base URL of the HTTP store
    #[arg(long, global = true)]
    url: Option<String>,

    /// Session file of the local store
    #[arg(long, global = true)]
    store_path: Option<PathBuf>,

    /// Comma-separated labels (e.g. "Same,Related,Different")
    #[arg(long)]
    labels: Option<String>,

    /// File with the first item list (one item per line)
    #[arg(long, requires = "list2", conflicts_with = "csv")]
    list1: Option<PathBuf>,

    /// File with the second item list
    #[arg(long, requires = "list1")]
    list2: Option<PathBuf>,

    /// CSV file holding both lists as columns
    #[arg(long)]
    csv: Option<PathBuf>,

    /// CSV column for list 1 (default: first header)
    #[arg(long, requires = "csv")]
    column1: Option<String>,

    /// CSV column for list 2 (default: second header)
    #[arg(long, requires = "csv")]
    column2: Option<String>,

    /// CSV column with existing judgments (default: third header)
    #[arg(long, requires = "csv")]
    annotation_column: Option<String>,

    /// Open the stored session directly
    #[arg(long, conflicts_with_all = ["list1", "csv"])]
    resume: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write the default config file
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
    /// Print a JSON summary of the stored session
    Status,
    /// Download the results table
    Export {
        /// Output file or directory (default: export.dir from config)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Discard the stored session
    Reset,
}

/// Install the file logger when `SIMJUDGE_LOG` is set. The TUI owns stdout.
fn init_tracing() -> Result<()> {
    let Ok(filter) = tracing_subscriber::EnvFilter::try_from_env(LOG_ENV) else {
        return Ok(());
    };
    let dir = config::cache_dir();
    fs::create_dir_all(&dir).context("Failed to create cache directory")?;
    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join("simjudge.log"))
        .context("Failed to open log file")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

/// CLI フラグで設定ファイルの値を上書き
fn apply_overrides(config: &mut Config, args: &Args) {
    if let Some(backend) = args.backend {
        config.store.backend = backend;
    }
    if let Some(url) = &args.url {
        config.store.url = url.clone();
    }
    if let Some(path) = &args.store_path {
        config.store.path = Some(path.clone());
    }
    if let Some(labels) = &args.labels {
        config.labels = labels.clone();
    }
}

fn read_list(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read list file {}", path.display()))
}

/// Prefill the setup form from file arguments.
fn build_source(args: &Args) -> Result<SourceConfig> {
    let mut source = SourceConfig::default();

    if let (Some(list1), Some(list2)) = (&args.list1, &args.list2) {
        source.text = TextLists::new(read_list(list1)?, read_list(list2)?);
    }

    if let Some(path) = &args.csv {
        let mut selection = CsvSelection::load(path)?;
        let overrides = [
            (ColumnField::Column1, &args.column1),
            (ColumnField::Column2, &args.column2),
            (ColumnField::Annotation, &args.annotation_column),
        ];
        for (field, column) in overrides {
            if let Some(name) = column {
                if !selection.select(field, name) {
                    bail!(
                        "Column '{}' not found in {} (headers: {})",
                        name,
                        path.display(),
                        selection.headers().join(", ")
                    );
                }
            }
        }
        source.csv = Some(selection);
        source.mode = InputMode::Csv;
    }

    Ok(source)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing()?;

    if let Some(Commands::Init { force }) = args.command {
        return init::run_init(force);
    }

    let mut config = Config::load(args.config.as_deref())?;
    apply_overrides(&mut config, &args);
    let store = store::create_store(&config.store)?;

    match args.command {
        Some(Commands::Status) => headless::run_status(store).await,
        Some(Commands::Export { ref output }) => {
            let target = output.clone().unwrap_or_else(|| config.export.dir.clone());
            headless::run_export(store, &target).await.map(|_| ())
        }
        Some(Commands::Reset) => headless::run_reset(store).await,
        Some(Commands::Init { .. }) => Ok(()),
        None => {
            let source = build_source(&args)?;
            let labels = LabelSet::new(config.labels.clone());
            let mut app = app::App::new(config, store, labels, source);
            if args.resume {
                app.resume();
            }
            app.run().await
        }
    }
}
