//! Local index → persisted player id translation for one import run.

use std::collections::{HashMap, HashSet};

use crate::{
  Error, Result,
  model::{LocalIndex, Owner, PersistedPlayer, PlayerId},
};

/// Bijection between the player slots of one save file and the player rows
/// inserted for it.
///
/// Built once, right after the players are persisted, and owned by the import
/// run that built it.
#[derive(Debug, Clone, Default)]
pub struct IdentityMap {
  by_local: HashMap<LocalIndex, PlayerId>,
}

impl IdentityMap {
  /// Build the map from `(local index, player id)` pairs, rejecting any
  /// repeated local index or player id.
  pub fn build(pairs: impl IntoIterator<Item = (LocalIndex, PlayerId)>) -> Result<Self> {
    let mut by_local = HashMap::new();
    let mut seen_ids = HashSet::new();

    for (local, player_id) in pairs {
      if !seen_ids.insert(player_id) {
        return Err(Error::DuplicatePlayerId(player_id));
      }
      if by_local.insert(local, player_id).is_some() {
        return Err(Error::DuplicateLocalIndex(local));
      }
    }

    Ok(Self { by_local })
  }

  pub fn from_players(players: &[PersistedPlayer]) -> Result<Self> {
    Self::build(players.iter().map(|p| (p.local_index, p.player_id)))
  }

  pub fn resolve(&self, local: LocalIndex) -> Result<PlayerId> {
    self
      .by_local
      .get(&local)
      .copied()
      .ok_or(Error::UnmappedLocalIndex(local))
  }

  /// Translate a tile owner. [`Owner::Nobody`] becomes `None` without a
  /// lookup.
  pub fn resolve_owner(&self, owner: Owner) -> Result<Option<PlayerId>> {
    match owner {
      Owner::Nobody => Ok(None),
      Owner::Player(local) => self.resolve(local).map(Some),
    }
  }

  pub fn len(&self) -> usize { self.by_local.len() }

  pub fn is_empty(&self) -> bool { self.by_local.is_empty() }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn two_players() -> IdentityMap {
    IdentityMap::build([(LocalIndex(1), PlayerId(41)), (LocalIndex(2), PlayerId(42))])
      .unwrap()
  }

  #[test]
  fn resolves_known_indexes() {
    let map = two_players();
    assert_eq!(map.len(), 2);
    assert_eq!(map.resolve(LocalIndex(1)).unwrap(), PlayerId(41));
    assert_eq!(map.resolve(LocalIndex(2)).unwrap(), PlayerId(42));
  }

  #[test]
  fn unmapped_index_fails_loudly() {
    let err = two_players().resolve(LocalIndex(3)).unwrap_err();
    assert!(matches!(err, Error::UnmappedLocalIndex(LocalIndex(3))));
  }

  #[test]
  fn nobody_is_never_looked_up() {
    let empty = IdentityMap::default();
    assert!(empty.is_empty());
    assert_eq!(empty.resolve_owner(Owner::Nobody).unwrap(), None);
    assert!(empty.resolve_owner(Owner::Player(LocalIndex(1))).is_err());
  }

  #[test]
  fn owner_translation_uses_persisted_id() {
    let map = two_players();
    assert_eq!(
      map.resolve_owner(Owner::Player(LocalIndex(2))).unwrap(),
      Some(PlayerId(42))
    );
  }

  #[test]
  fn duplicate_local_index_is_rejected() {
    let err = IdentityMap::build([(LocalIndex(1), PlayerId(1)), (LocalIndex(1), PlayerId(2))])
      .unwrap_err();
    assert!(matches!(err, Error::DuplicateLocalIndex(LocalIndex(1))));
  }

  #[test]
  fn duplicate_player_id_is_rejected() {
    let err = IdentityMap::build([(LocalIndex(1), PlayerId(7)), (LocalIndex(2), PlayerId(7))])
      .unwrap_err();
    assert!(matches!(err, Error::DuplicatePlayerId(PlayerId(7))));
  }

  #[test]
  fn from_players_reads_both_identity_spaces() {
    let players = vec![PersistedPlayer {
      player_id:   PlayerId(10),
      local_index: LocalIndex(1),
      name:        "Ashurbanipal".into(),
    }];
    let map = IdentityMap::from_players(&players).unwrap();
    assert_eq!(map.resolve(LocalIndex(1)).unwrap(), PlayerId(10));
  }
}
