//! Error type for `tourney-ingest`.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("failed to read {}: {source}", .path.display())]
  Read {
    path:   PathBuf,
    source: std::io::Error,
  },

  #[error("unreadable save archive: {0}")]
  Save(#[from] tourney_save::Error),

  #[error("player identity error: {0}")]
  Identity(#[from] tourney_core::Error),

  #[error("store error: {0}")]
  Store(#[from] tourney_store_sqlite::Error),

  /// Failure reported by a `MatchWriter` backend mid-import.
  #[error("write failed: {0}")]
  Write(Box<dyn std::error::Error + Send + Sync>),

  #[error("invalid override file: {0}")]
  Overrides(#[from] serde_json::Error),

  #[error("background task failed: {0}")]
  Join(#[from] tokio::task::JoinError),

  #[error("import of {} did not complete", .0.display())]
  Incomplete(PathBuf),
}

impl Error {
  pub(crate) fn write<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Write(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
