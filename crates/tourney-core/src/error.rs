//! Error types for `tourney-core`.

use thiserror::Error;

use crate::model::{LocalIndex, PlayerId};

#[derive(Debug, Error)]
pub enum Error {
  /// A record referenced a player slot that was never inserted for this
  /// match. Always an extraction or ordering bug.
  #[error("no persisted player for local index {0}")]
  UnmappedLocalIndex(LocalIndex),

  #[error("local index {0} appears more than once in the roster")]
  DuplicateLocalIndex(LocalIndex),

  #[error("player id {0} is mapped from more than one local index")]
  DuplicatePlayerId(PlayerId),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
