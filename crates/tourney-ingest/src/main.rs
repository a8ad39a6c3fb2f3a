//! `tourney-import`: load tournament save archives into SQLite.
//!
//! Reads `tourney.toml` (or the path given with `--config`), layers
//! `TOURNEY_*` environment variables and command-line flags over it, and
//! imports every archive named on the command line. Directories are scanned
//! for `*.zip` files.
//!
//! ```text
//! tourney-import --overrides overrides.json saves/
//! tourney-import --force --external-id 426504721 saves/round2.zip
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use clap::Parser;
use tourney_core::winner::OverrideTable;
use tourney_ingest::{
  IngestConfig,
  batch::{BatchOptions, import_batch},
  overrides::load_overrides,
};
use tourney_store_sqlite::SqliteStore;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Import tournament save archives into SQLite")]
struct Cli {
  /// Save archives, or directories containing them.
  #[arg(required = true)]
  paths: Vec<PathBuf>,

  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "tourney.toml")]
  config: PathBuf,

  /// SQLite database to import into.
  #[arg(short, long)]
  database: Option<PathBuf>,

  /// JSON file of manual winner corrections.
  #[arg(long)]
  overrides: Option<PathBuf>,

  /// Re-import archives that are already stored.
  #[arg(short, long)]
  force: bool,

  /// Tournament match id, when it cannot be read from the archive name.
  #[arg(long)]
  external_id: Option<String>,

  /// Number of archives to extract concurrently.
  #[arg(short, long)]
  jobs: Option<usize>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Load configuration.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config.clone()).required(false))
    .add_source(config::Environment::with_prefix("TOURNEY").try_parsing(true))
    .build()
    .context("failed to read config file")?;

  let mut cfg: IngestConfig = settings
    .try_deserialize()
    .context("failed to deserialise IngestConfig")?;

  if let Some(database) = cli.database {
    cfg.database_path = database;
  }
  if cli.overrides.is_some() {
    cfg.overrides_path = cli.overrides;
  }
  if let Some(jobs) = cli.jobs {
    cfg.workers = jobs;
  }

  let archives = collect_archives(&cli.paths)?;
  if archives.is_empty() {
    anyhow::bail!("no .zip archives found");
  }
  if cli.external_id.is_some() && archives.len() > 1 {
    anyhow::bail!("--external-id applies to a single archive, got {}", archives.len());
  }

  let overrides = match &cfg.overrides_path {
    Some(path) => load_overrides(&expand_tilde(path))
      .await
      .context("failed to load winner overrides")?,
    None => OverrideTable::default(),
  };

  // Expand `~` in database path.
  let database_path = expand_tilde(&cfg.database_path);

  let store = SqliteStore::open(&database_path)
    .await
    .with_context(|| format!("failed to open store at {database_path:?}"))?;

  tracing::info!(archives = archives.len(), workers = cfg.workers, "starting import");
  let report = import_batch(
    store,
    archives,
    Arc::new(overrides),
    BatchOptions {
      force:       cli.force,
      external_id: cli.external_id,
      workers:     cfg.workers,
      batch_rows:  cfg.batch_rows,
    },
  )
  .await;

  let failed: Vec<_> = report.failed().collect();
  println!(
    "imported {}, skipped {}, failed {}",
    report.imported(),
    report.skipped(),
    failed.len()
  );
  for (path, error) in &failed {
    println!("  {}: {error}", path.display());
  }

  if !failed.is_empty() {
    anyhow::bail!("{} archive(s) failed to import", failed.len());
  }
  Ok(())
}

/// Expand directories to the `*.zip` files they contain, sorted by name.
fn collect_archives(paths: &[PathBuf]) -> anyhow::Result<Vec<PathBuf>> {
  let mut archives = Vec::new();
  for path in paths {
    if !path.is_dir() {
      archives.push(path.clone());
      continue;
    }

    let mut found = Vec::new();
    for entry in
      std::fs::read_dir(path).with_context(|| format!("failed to list {}", path.display()))?
    {
      let entry_path = entry?.path();
      let is_zip = entry_path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"));
      if is_zip && entry_path.is_file() {
        found.push(entry_path);
      }
    }
    found.sort();
    archives.extend(found);
  }
  Ok(archives)
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
