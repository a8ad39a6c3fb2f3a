//! Sparse-to-dense turn reconstruction.
//!
//! The game records a quantity only on the turn it changes. Reconstruction
//! carries the last recorded value forward so every turn `1..=final_turn` has
//! a materialised value:
//!
//! ```text
//! events:  T5=A            T20=-            T35=B
//! turns:   1..4 -> none    5..19 -> A       20..34 -> none    35.. -> B
//! ```
//!
//! Everything here is pure and independent of storage.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::model::Turn;

/// A value effective from `turn` until the next change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change<V> {
  pub turn:  Turn,
  pub value: V,
}

impl<V> Change<V> {
  pub fn new(turn: Turn, value: V) -> Self { Self { turn, value } }
}

/// A materialised value for one key at one turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot<K, V> {
  pub key:   K,
  pub turn:  Turn,
  /// `None` until the first change takes effect.
  pub value: Option<V>,
}

/// Expand a change stream into one value per turn, `1..=final_turn`.
///
/// Element `i` of the result holds the value at turn `i + 1`. Events are
/// expected in turn order; an unsorted stream is stable-sorted first, so of
/// two events on the same turn the later one wins. Events on turn 0 apply
/// from turn 1 and events after `final_turn` are ignored.
///
/// Runs in `O(events + final_turn)` for sorted input.
pub fn carry_forward<V: Clone>(events: &[Change<V>], final_turn: Turn) -> Vec<Option<V>> {
  let events: Cow<'_, [Change<V>]> = if events.is_sorted_by_key(|e| e.turn) {
    Cow::Borrowed(events)
  } else {
    let mut sorted = events.to_vec();
    sorted.sort_by_key(|e| e.turn);
    Cow::Owned(sorted)
  };

  let mut dense = Vec::with_capacity(final_turn as usize);
  let mut pending = events.iter().peekable();
  let mut current: Option<&V> = None;

  for turn in 1..=final_turn {
    while let Some(event) = pending.next_if(|e| e.turn <= turn) {
      current = Some(&event.value);
    }
    dense.push(current.cloned());
  }

  dense
}

/// [`carry_forward`] for a keyed entity, yielding one [`Snapshot`] per turn.
pub fn densify<K: Clone, V: Clone>(
  key: K,
  events: &[Change<V>],
  final_turn: Turn,
) -> impl Iterator<Item = Snapshot<K, V>> {
  carry_forward(events, final_turn)
    .into_iter()
    .zip(1..)
    .map(move |(value, turn)| Snapshot { key: key.clone(), turn, value })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::{LocalIndex, Owner, TileId};

  /// Owner of tile 0 on every turn, through the same `densify` path the
  /// importer uses. Turns before the first change are unowned.
  fn ownership_timeline(events: &[Change<Owner>], final_turn: Turn) -> Vec<Owner> {
    densify(TileId(0), events, final_turn)
      .map(|snapshot| snapshot.value.unwrap_or(Owner::Nobody))
      .collect()
  }

  const A: Owner = Owner::Player(LocalIndex(1));
  const B: Owner = Owner::Player(LocalIndex(2));

  fn owners_between(timeline: &[Owner], from: Turn, to: Turn) -> &[Owner] {
    &timeline[(from - 1) as usize..to as usize]
  }

  #[test]
  fn persists_until_changed() {
    let events = vec![
      Change::new(5, A),
      Change::new(20, Owner::Nobody),
      Change::new(35, B),
    ];
    let timeline = ownership_timeline(&events, 40);

    assert_eq!(timeline.len(), 40);
    assert!(owners_between(&timeline, 1, 4).iter().all(|o| *o == Owner::Nobody));
    assert!(owners_between(&timeline, 5, 19).iter().all(|o| *o == A));
    assert!(owners_between(&timeline, 20, 34).iter().all(|o| *o == Owner::Nobody));
    assert!(owners_between(&timeline, 35, 40).iter().all(|o| *o == B));
  }

  #[test]
  fn tile_without_events_is_never_owned() {
    let timeline = ownership_timeline(&[], 50);
    assert_eq!(timeline.len(), 50);
    assert!(timeline.iter().all(|o| *o == Owner::Nobody));
  }

  #[test]
  fn ownership_persists_past_last_event() {
    let timeline = ownership_timeline(&[Change::new(3, A)], 120);
    assert_eq!(timeline[1], Owner::Nobody);
    assert_eq!(timeline[2], A);
    assert_eq!(timeline[119], A);
  }

  #[test]
  fn unsorted_events_are_ordered_by_turn() {
    let events = vec![Change::new(10, B), Change::new(2, A)];
    let timeline = ownership_timeline(&events, 12);
    assert_eq!(timeline[0], Owner::Nobody);
    assert_eq!(timeline[1], A);
    assert_eq!(timeline[8], A);
    assert_eq!(timeline[9], B);
  }

  #[test]
  fn later_event_on_same_turn_wins() {
    let events = vec![Change::new(4, A), Change::new(4, B)];
    let timeline = ownership_timeline(&events, 5);
    assert_eq!(timeline[3], B);
  }

  #[test]
  fn turn_zero_applies_from_first_turn_and_overflow_is_dropped() {
    let events = vec![Change::new(0, A), Change::new(9, B)];
    let timeline = ownership_timeline(&events, 6);
    assert_eq!(timeline, vec![A; 6]);
  }

  #[test]
  fn zero_final_turn_yields_nothing() {
    assert!(carry_forward(&[Change::new(1, 7_i64)], 0).is_empty());
  }

  #[test]
  fn densify_tags_every_turn_with_its_key() {
    let snaps: Vec<_> = densify(TileId(9), &[Change::new(2, 'x')], 3).collect();
    assert_eq!(
      snaps,
      vec![
        Snapshot { key: TileId(9), turn: 1, value: None },
        Snapshot { key: TileId(9), turn: 2, value: Some('x') },
        Snapshot { key: TileId(9), turn: 3, value: Some('x') },
      ]
    );
  }

  #[test]
  fn disjoint_tiles_reconstruct_independently() {
    let first = ownership_timeline(&[Change::new(2, A)], 4);
    let second = ownership_timeline(&[Change::new(3, B), Change::new(4, Owner::Nobody)], 4);
    assert_eq!(first, vec![Owner::Nobody, A, A, A]);
    assert_eq!(second, vec![Owner::Nobody, Owner::Nobody, B, Owner::Nobody]);
  }
}
