//! Ingestion pipeline for tournament save archives.
//!
//! Ties the save codec ([`tourney_save`]), the reconstruction and identity
//! logic ([`tourney_core`]), and the SQLite store ([`tourney_store_sqlite`])
//! together, and exposes the batch runner used by the `tourney-import`
//! binary.

pub mod batch;
pub mod error;
pub mod overrides;
pub mod pipeline;

#[cfg(test)]
mod fixture;

pub use error::{Error, Result};

use std::path::PathBuf;

use serde::Deserialize;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime import configuration, deserialised from `tourney.toml` and
/// `TOURNEY_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct IngestConfig {
  pub database_path:  PathBuf,
  pub overrides_path: Option<PathBuf>,
  /// Archives extracted concurrently.
  pub workers:        usize,
  /// Rows buffered per bulk insert.
  pub batch_rows:     usize,
}

impl Default for IngestConfig {
  fn default() -> Self {
    Self {
      database_path:  PathBuf::from("tourney.db"),
      overrides_path: None,
      workers:        std::thread::available_parallelism().map_or(4, usize::from),
      batch_rows:     pipeline::DEFAULT_BATCH_ROWS,
    }
  }
}
