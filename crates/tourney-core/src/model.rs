//! Match, player, and tile types shared by the codec, pipeline, and store.
//!
//! Two identity spaces exist side by side. A [`LocalIndex`] is a player's
//! position as encoded in one save file; a [`PlayerId`] is the surrogate key
//! the store assigned when that player was inserted. The only bridge between
//! them is [`IdentityMap`](crate::identity::IdentityMap).

use std::{collections::BTreeMap, fmt};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  metric::{MetricFamily, Sample},
  reconstruct::Change,
};

/// A game turn. Turn 1 is the first turn played.
pub type Turn = u32;

// ─── Identifiers ─────────────────────────────────────────────────────────────

/// A player's 1-based position within one save file.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct LocalIndex(pub u32);

impl LocalIndex {
  /// Convert the 0-based player id written by the game into a local index.
  /// `None` when the id has no 1-based counterpart.
  pub fn from_source_id(id: u32) -> Option<Self> { id.checked_add(1).map(Self) }

  /// Position of this player in an extracted roster.
  pub fn position(self) -> usize { self.0.saturating_sub(1) as usize }
}

impl fmt::Display for LocalIndex {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "#{}", self.0)
  }
}

/// Surrogate key of a persisted player row.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct PlayerId(pub i64);

impl fmt::Display for PlayerId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.0.fmt(f) }
}

/// Surrogate key of a persisted match row.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct MatchId(pub i64);

impl fmt::Display for MatchId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.0.fmt(f) }
}

/// Linear index of a map cell.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct TileId(pub u32);

// ─── Ownership ───────────────────────────────────────────────────────────────

/// Owner of a tile as written in the save file.
///
/// The "no owner" sentinel is decoded into [`Owner::Nobody`] by the codec and
/// is never looked up in an identity map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Owner {
  Nobody,
  Player(LocalIndex),
}

/// A sparse ownership change: the owner effective from `turn` onward.
pub type OwnershipEvent = Change<Owner>;

// ─── Extracted records ───────────────────────────────────────────────────────

/// Match-level metadata read from the save root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchMeta {
  /// The game's own identifier for the session, if written.
  pub game_id:    Option<String>,
  pub game_name:  Option<String>,
  pub save_date:  Option<String>,
  pub map_class:  Option<String>,
  pub map_size:   Option<String>,
  pub map_width:  u32,
  /// The last turn played; the upper bound for snapshot generation.
  pub final_turn: Turn,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRecord {
  pub local_index: LocalIndex,
  pub name:        String,
  pub nation:      Option<String>,
  pub team:        Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileRecord {
  pub id:      TileId,
  pub x:       u32,
  pub y:       u32,
  pub terrain: Option<String>,
  pub height:  Option<String>,
}

impl TileRecord {
  /// Build a tile, deriving its column and row from the map width.
  pub fn new(
    id: TileId,
    map_width: u32,
    terrain: Option<String>,
    height: Option<String>,
  ) -> Self {
    let (x, y) = coordinates(id, map_width);
    Self { id, x, y, terrain, height }
  }
}

/// `(column, row)` of a tile on a map `map_width` cells wide.
pub fn coordinates(id: TileId, map_width: u32) -> (u32, u32) {
  debug_assert!(map_width > 0);
  (id.0 % map_width, id.0 / map_width)
}

/// Everything the codec pulls out of one save document.
#[derive(Debug, Clone, Default)]
pub struct ExtractedMatch {
  pub meta:             MatchMeta,
  /// Ordered so that `players[i].local_index.position() == i`.
  pub players:          Vec<PlayerRecord>,
  pub tiles:            Vec<TileRecord>,
  /// Ownership change events per tile, ordered by turn. Tiles that never
  /// changed hands have no entry.
  pub ownership:        BTreeMap<TileId, Vec<OwnershipEvent>>,
  pub metrics:          BTreeMap<MetricFamily, Vec<Sample>>,
  /// The winner indicated by the file itself, if any.
  pub winner_candidate: Option<LocalIndex>,
}

impl ExtractedMatch {
  pub fn samples(&self, family: MetricFamily) -> &[Sample] {
    self.metrics.get(&family).map_or(&[], Vec::as_slice)
  }

  pub fn ownership_events(&self, tile: TileId) -> &[OwnershipEvent] {
    self.ownership.get(&tile).map_or(&[], Vec::as_slice)
  }
}

// ─── Rows handed to the store ────────────────────────────────────────────────

/// A match row ready for insertion.
#[derive(Debug, Clone)]
pub struct NewMatch {
  /// Identifier in the external tournament system, if known.
  pub external_id:  Option<String>,
  /// Hex SHA-256 of the archive bytes; the dedup key.
  pub content_hash: String,
  pub file_name:    String,
  pub meta:         MatchMeta,
  pub imported_at:  DateTime<Utc>,
}

/// A player as persisted, carrying both identity spaces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedPlayer {
  pub player_id:   PlayerId,
  pub local_index: LocalIndex,
  pub name:        String,
}

/// One dense territory snapshot row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerritoryRow<'a> {
  pub tile_id: TileId,
  pub turn:    Turn,
  pub owner:   Option<PlayerId>,
  pub terrain: Option<&'a str>,
}

/// A temporal sample whose player reference has been translated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedSample<'a> {
  pub player_id: PlayerId,
  pub turn:      Turn,
  pub category:  Option<&'a str>,
  pub value:     i64,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn coordinates_wrap_on_map_width() {
    assert_eq!(coordinates(TileId(0), 46), (0, 0));
    assert_eq!(coordinates(TileId(45), 46), (45, 0));
    assert_eq!(coordinates(TileId(46), 46), (0, 1));
    assert_eq!(coordinates(TileId(100), 46), (8, 2));
  }

  #[test]
  fn local_index_is_one_based() {
    let first = LocalIndex::from_source_id(0).unwrap();
    assert_eq!(first, LocalIndex(1));
    assert_eq!(first.position(), 0);
    assert_eq!(LocalIndex::from_source_id(3).unwrap().position(), 3);
  }

  #[test]
  fn largest_source_id_has_no_local_index() {
    assert_eq!(LocalIndex::from_source_id(u32::MAX), None);
    assert_eq!(LocalIndex::from_source_id(u32::MAX - 1), Some(LocalIndex(u32::MAX)));
  }
}
