//! spotmixd — the spotmix daemon.
//!
//! Single binary that wires the capacity-mix policy to a redb-backed
//! cluster view:
//! - Snapshot import (nodes + tasks)
//! - One-off or bulk scheduling cycles (score, normalize, bind, reconcile)
//!
//! # Usage
//!
//! ```text
//! spotmixd --data-dir /var/lib/spotmix import --snapshot cluster.json
//! spotmixd --config spotmix.toml schedule --task default/web-3
//! spotmixd --log-json schedule-pending --dry-run
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use spotmix_core::{ClusterSnapshot, SpotmixConfig, split_task_key};
use spotmix_placement::{CapacityMixPolicy, CycleMode, run_cycle, run_pending};
use spotmix_state::StateStore;
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_DATA_DIR: &str = "/var/lib/spotmix";
const DEFAULT_LOG_FILTER: &str = "info,spotmixd=debug,spotmix_placement=debug";

#[derive(Parser)]
#[command(name = "spotmixd", about = "spotmix capacity-mix scheduler")]
struct Cli {
    /// Path to spotmix.toml. Built-in defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Data directory for the state store. Overrides `[state].data_dir`.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Emit logs as JSON lines instead of text.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load a JSON cluster snapshot (nodes and tasks) into the store.
    Import {
        #[arg(long)]
        snapshot: PathBuf,
    },

    /// Run one scheduling cycle for a task.
    Schedule {
        /// Task key, `{namespace}/{name}`.
        #[arg(long)]
        task: String,

        /// Score and select without binding.
        #[arg(long)]
        dry_run: bool,
    },

    /// Run a scheduling cycle for every unplaced task.
    SchedulePending {
        #[arg(long)]
        dry_run: bool,
    },

    /// Write a spotmix.toml with every default spelled out.
    InitConfig {
        #[arg(long, default_value = "spotmix.toml")]
        path: PathBuf,

        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_json);

    let config = match &cli.config {
        Some(path) => SpotmixConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => SpotmixConfig::default(),
    };
    let data_dir = cli
        .data_dir
        .clone()
        .or_else(|| config.state.as_ref().map(|s| s.data_dir.clone()))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));

    match cli.command {
        Command::Import { snapshot } => import(&data_dir, &snapshot),
        Command::Schedule { task, dry_run } => {
            if split_task_key(&task).is_none() {
                bail!("task key must look like namespace/name, got {task:?}");
            }
            let store = open_store(&data_dir)?;
            let policy = CapacityMixPolicy::new(config.policy)?;
            let report = run_cycle(&policy, &store, &task, mode(dry_run)).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Command::SchedulePending { dry_run } => {
            let store = open_store(&data_dir)?;
            let policy = CapacityMixPolicy::new(config.policy)?;
            let reports = run_pending(&policy, &store, mode(dry_run)).await?;
            println!("{}", serde_json::to_string_pretty(&reports)?);
            Ok(())
        }
        Command::InitConfig { path, force } => init_config(&path, &data_dir, force),
    }
}

fn init_logging(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn mode(dry_run: bool) -> CycleMode {
    if dry_run { CycleMode::DryRun } else { CycleMode::Bind }
}

fn open_store(data_dir: &Path) -> anyhow::Result<StateStore> {
    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("creating data dir {}", data_dir.display()))?;
    let db_path = data_dir.join("spotmix.redb");
    let store = StateStore::open(&db_path)?;
    info!(path = ?db_path, "state store opened");
    Ok(store)
}

fn import(data_dir: &Path, snapshot_path: &Path) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(snapshot_path)
        .with_context(|| format!("reading snapshot {}", snapshot_path.display()))?;
    let snapshot: ClusterSnapshot = serde_json::from_str(&content)
        .with_context(|| format!("parsing snapshot {}", snapshot_path.display()))?;

    let store = open_store(data_dir)?;
    store.import_snapshot(&snapshot)?;
    info!(
        nodes = snapshot.nodes.len(),
        tasks = snapshot.tasks.len(),
        "snapshot imported"
    );
    Ok(())
}

fn init_config(path: &Path, data_dir: &Path, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    let rendered = SpotmixConfig::scaffold(data_dir).to_toml_string()?;
    std::fs::write(path, rendered).with_context(|| format!("writing {}", path.display()))?;
    info!(path = %path.display(), "config written");
    Ok(())
}
