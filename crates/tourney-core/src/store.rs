//! The `MatchWriter` trait: the seam between the pipeline and storage.
//!
//! A writer is a single transactional session scoped to one match import.
//! Backends (e.g. `tourney-store-sqlite`) hand the pipeline a writer inside
//! a transaction and commit only if the pipeline returns successfully, so a
//! failed import never leaves partial rows behind.

use crate::{
  metric::MetricFamily,
  model::{MatchId, NewMatch, PersistedPlayer, PlayerRecord, ResolvedSample, TerritoryRow, TileRecord},
  winner::MatchWinner,
};

/// Write access to the persisted store for one match import.
///
/// Bulk methods receive whole batches; implementations are expected to write
/// each batch with multi-row statements rather than one statement per row.
pub trait MatchWriter {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Look up an already-imported match by archive content hash.
  fn find_match_by_hash(&mut self, content_hash: &str) -> Result<Option<MatchId>, Self::Error>;

  /// Earlier imports of the same match, whatever their content.
  ///
  /// A match is identified by its external id when it has one, and by
  /// archive file name among matches without one.
  fn find_prior_versions(
    &mut self,
    external_id: Option<&str>,
    file_name: &str,
  ) -> Result<Vec<MatchId>, Self::Error>;

  /// Delete a match and every row that depends on it, children first.
  fn delete_match(&mut self, match_id: MatchId) -> Result<(), Self::Error>;

  fn insert_match(&mut self, new_match: &NewMatch) -> Result<MatchId, Self::Error>;

  /// Insert the roster and return each player with its assigned id.
  fn insert_players(
    &mut self,
    match_id: MatchId,
    players: &[PlayerRecord],
  ) -> Result<Vec<PersistedPlayer>, Self::Error>;

  fn insert_tiles(&mut self, match_id: MatchId, tiles: &[TileRecord]) -> Result<usize, Self::Error>;

  fn insert_territory(
    &mut self,
    match_id: MatchId,
    rows: &[TerritoryRow<'_>],
  ) -> Result<usize, Self::Error>;

  fn insert_samples(
    &mut self,
    match_id: MatchId,
    family: MetricFamily,
    rows: &[ResolvedSample<'_>],
  ) -> Result<usize, Self::Error>;

  fn insert_winner(&mut self, match_id: MatchId, winner: &MatchWinner) -> Result<(), Self::Error>;
}
