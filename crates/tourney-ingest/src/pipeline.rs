//! Import of a single match archive.
//!
//! Rows are written in dependency order inside one transaction:
//!
//! ```text
//! match → players (identity map) → tiles → territories → samples → winner
//! ```
//!
//! A non-forced import of an archive whose content hash is already stored is
//! a no-op. A forced import deletes every earlier version of the match first
//! (same content hash, or same external id, or same file name when there is
//! no external id), inside the same transaction, so a failure part way
//! through leaves the previous import intact.

use std::{collections::BTreeMap, path::Path, sync::Arc};

use chrono::Utc;
use sha2::{Digest as _, Sha256};
use strum::IntoEnumIterator as _;
use tourney_core::{
  identity::IdentityMap,
  metric::MetricFamily,
  model::{ExtractedMatch, MatchId, NewMatch, ResolvedSample, TerritoryRow},
  reconstruct::{Change, densify},
  store::MatchWriter,
  winner::{OverrideTable, WinnerResolution, resolve_winner},
};
use tourney_store_sqlite::SqliteStore;

use crate::{Error, Result};

pub const DEFAULT_BATCH_ROWS: usize = 5_000;

// ─── Options and outcomes ────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ImportOptions {
  /// Replace earlier imports of the same match, changed or not.
  pub force:       bool,
  /// Tournament system id; the key into the override table.
  pub external_id: Option<String>,
  /// Rows buffered before each bulk write.
  pub batch_rows:  usize,
}

impl Default for ImportOptions {
  fn default() -> Self {
    Self { force: false, external_id: None, batch_rows: DEFAULT_BATCH_ROWS }
  }
}

/// Rows written by one import.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowsWritten {
  pub players:     usize,
  pub tiles:       usize,
  pub territories: usize,
  pub samples:     BTreeMap<MetricFamily, usize>,
  pub winner:      bool,
}

#[derive(Debug)]
pub enum ImportOutcome {
  Imported {
    match_id: MatchId,
    /// Earlier versions this import replaced, for forced re-imports.
    replaced: Vec<MatchId>,
    rows:     RowsWritten,
  },
  /// The archive was already imported and `force` was not set.
  Skipped { match_id: MatchId },
}

impl ImportOutcome {
  pub fn match_id(&self) -> MatchId {
    match self {
      Self::Imported { match_id, .. } | Self::Skipped { match_id } => *match_id,
    }
  }
}

/// An extracted archive ready to be written.
#[derive(Debug)]
pub struct PreparedMatch {
  pub new_match: NewMatch,
  pub extracted: ExtractedMatch,
}

// ─── Preparation ─────────────────────────────────────────────────────────────

/// Hex SHA-256 of the archive bytes; the deduplication key.
pub fn content_hash(bytes: &[u8]) -> String { hex::encode(Sha256::digest(bytes)) }

/// Open and extract an archive. CPU-bound; run it off the async runtime.
pub fn prepare(
  bytes: &[u8],
  content_hash: String,
  file_name: String,
  external_id: Option<String>,
) -> Result<PreparedMatch> {
  let extracted = tourney_save::load(bytes)?;
  let new_match = NewMatch {
    external_id,
    content_hash,
    file_name,
    meta: extracted.meta.clone(),
    imported_at: Utc::now(),
  };
  Ok(PreparedMatch { new_match, extracted })
}

// ─── Writing ─────────────────────────────────────────────────────────────────

/// Write one prepared match through `writer`.
///
/// The caller owns the transaction: any error returned here must cause it to
/// be rolled back.
pub fn write_match<W: MatchWriter>(
  writer: &mut W,
  prepared: &PreparedMatch,
  overrides: &OverrideTable,
  options: &ImportOptions,
) -> Result<ImportOutcome> {
  let PreparedMatch { new_match, extracted } = prepared;
  let label = new_match.file_name.as_str();
  let batch_rows = options.batch_rows.max(1);

  let same_content = writer
    .find_match_by_hash(&new_match.content_hash)
    .map_err(Error::write)?;
  if let Some(existing) = same_content
    && !options.force
  {
    tracing::info!(match_label = label, match_id = %existing, "already imported; skipping");
    return Ok(ImportOutcome::Skipped { match_id: existing });
  }

  let mut replaced = Vec::new();
  if options.force {
    replaced = writer
      .find_prior_versions(new_match.external_id.as_deref(), &new_match.file_name)
      .map_err(Error::write)?;
    if let Some(existing) = same_content
      && !replaced.contains(&existing)
    {
      replaced.push(existing);
    }
    for &previous in &replaced {
      tracing::info!(match_label = label, match_id = %previous, "forced re-import; deleting previous rows");
      writer.delete_match(previous).map_err(Error::write)?;
    }
  }

  let match_id = writer.insert_match(new_match).map_err(Error::write)?;

  let roster = writer
    .insert_players(match_id, &extracted.players)
    .map_err(Error::write)?;
  let identity = IdentityMap::from_players(&roster)?;

  let mut rows = RowsWritten {
    players: roster.len(),
    tiles: writer
      .insert_tiles(match_id, &extracted.tiles)
      .map_err(Error::write)?,
    ..RowsWritten::default()
  };

  rows.territories = write_territory(writer, match_id, extracted, &identity, batch_rows)?;

  for family in MetricFamily::iter() {
    let written = write_samples(writer, match_id, extracted, family, &identity, batch_rows)?;
    rows.samples.insert(family, written);
  }

  let candidate = extracted
    .winner_candidate
    .map(|local| identity.resolve(local))
    .transpose()?;
  let resolution = resolve_winner(
    label,
    new_match.external_id.as_deref(),
    overrides,
    &roster,
    candidate,
  );
  match resolution {
    WinnerResolution::Resolved(winner) => {
      writer.insert_winner(match_id, &winner).map_err(Error::write)?;
      rows.winner = true;
    }
    WinnerResolution::Unresolved => {
      tracing::warn!(match_label = label, "no winner could be determined");
    }
  }

  tracing::info!(
    match_label = label,
    %match_id,
    players = rows.players,
    tiles = rows.tiles,
    territories = rows.territories,
    samples = rows.samples.values().sum::<usize>(),
    "imported match"
  );
  Ok(ImportOutcome::Imported { match_id, replaced, rows })
}

/// One territory row per tile per turn, written in `batch_rows` chunks.
///
/// Each tile's change events are translated to persisted ids once, before
/// densifying, so the identity map is consulted per event rather than per
/// turn.
fn write_territory<W: MatchWriter>(
  writer: &mut W,
  match_id: MatchId,
  extracted: &ExtractedMatch,
  identity: &IdentityMap,
  batch_rows: usize,
) -> Result<usize> {
  let final_turn = extracted.meta.final_turn;
  let mut buffer: Vec<TerritoryRow<'_>> = Vec::with_capacity(batch_rows);
  let mut written = 0;

  for tile in &extracted.tiles {
    let events = extracted
      .ownership_events(tile.id)
      .iter()
      .map(|e| Ok(Change::new(e.turn, identity.resolve_owner(e.value)?)))
      .collect::<Result<Vec<_>>>()?;

    for snapshot in densify(tile.id, &events, final_turn) {
      buffer.push(TerritoryRow {
        tile_id: snapshot.key,
        turn:    snapshot.turn,
        owner:   snapshot.value.flatten(),
        terrain: tile.terrain.as_deref(),
      });
      if buffer.len() >= batch_rows {
        written += writer
          .insert_territory(match_id, &buffer)
          .map_err(Error::write)?;
        buffer.clear();
      }
    }
  }

  if !buffer.is_empty() {
    written += writer
      .insert_territory(match_id, &buffer)
      .map_err(Error::write)?;
  }
  Ok(written)
}

fn write_samples<W: MatchWriter>(
  writer: &mut W,
  match_id: MatchId,
  extracted: &ExtractedMatch,
  family: MetricFamily,
  identity: &IdentityMap,
  batch_rows: usize,
) -> Result<usize> {
  let resolved = extracted
    .samples(family)
    .iter()
    .map(|s| {
      Ok(ResolvedSample {
        player_id: identity.resolve(s.player)?,
        turn:      s.turn,
        category:  s.category.as_deref(),
        value:     s.value,
      })
    })
    .collect::<Result<Vec<_>>>()?;

  let mut written = 0;
  for chunk in resolved.chunks(batch_rows) {
    written += writer
      .insert_samples(match_id, family, chunk)
      .map_err(Error::write)?;
  }
  Ok(written)
}

// ─── Entry points ────────────────────────────────────────────────────────────

/// Import archive bytes into `store`.
pub async fn import_bytes(
  store: &SqliteStore,
  bytes: Vec<u8>,
  file_name: String,
  overrides: Arc<OverrideTable>,
  options: ImportOptions,
) -> Result<ImportOutcome> {
  let hash = content_hash(&bytes);

  if !options.force
    && let Some(match_id) = store.find_match_by_hash(&hash).await?
  {
    tracing::info!(match_label = %file_name, %match_id, "already imported; skipping");
    return Ok(ImportOutcome::Skipped { match_id });
  }

  let external_id = options.external_id.clone();
  let prepared =
    tokio::task::spawn_blocking(move || prepare(&bytes, hash, file_name, external_id)).await??;

  store
    .in_transaction(move |writer| write_match(writer, &prepared, &overrides, &options))
    .await?
}

/// Read and import one archive file.
pub async fn import_archive(
  store: &SqliteStore,
  path: &Path,
  overrides: Arc<OverrideTable>,
  options: ImportOptions,
) -> Result<ImportOutcome> {
  let bytes = tokio::fs::read(path)
    .await
    .map_err(|source| Error::Read { path: path.to_path_buf(), source })?;
  let file_name = path
    .file_name()
    .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
  import_bytes(store, bytes, file_name, overrides, options).await
}
