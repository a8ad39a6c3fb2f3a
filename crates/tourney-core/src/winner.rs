//! Match winner resolution: manual overrides first, the file second.
//!
//! ```text
//! override for match?
//!   no  ─────────────────────────────────────► file candidate (File) | Unresolved
//!   yes ─► named player on roster?
//!            yes ─────────────────────────────► that player (ManualOverride)
//!            no  ─► log error ────────────────► file candidate (File) | Unresolved
//! ```
//!
//! A bad override never discards a winner the file could supply and never
//! fails the import.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::model::{PersistedPlayer, PlayerId};

// ─── Overrides ───────────────────────────────────────────────────────────────

/// A hand-written correction to a match result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinnerOverride {
  /// Display name of the winning player, compared exactly.
  pub winner_player_name: String,
  pub reason:             String,
  #[serde(default)]
  pub date:               Option<String>,
  #[serde(default)]
  pub notes:              Option<String>,
}

/// Overrides keyed by external match id. Read-only during import.
#[derive(Debug, Clone, Default)]
pub struct OverrideTable {
  entries: HashMap<String, WinnerOverride>,
}

impl OverrideTable {
  pub fn insert(&mut self, external_id: impl Into<String>, entry: WinnerOverride) {
    self.entries.insert(external_id.into(), entry);
  }

  pub fn get(&self, external_id: &str) -> Option<&WinnerOverride> {
    self.entries.get(external_id)
  }

  pub fn len(&self) -> usize { self.entries.len() }

  pub fn is_empty(&self) -> bool { self.entries.is_empty() }
}

impl FromIterator<(String, WinnerOverride)> for OverrideTable {
  fn from_iter<I: IntoIterator<Item = (String, WinnerOverride)>>(iter: I) -> Self {
    Self { entries: iter.into_iter().collect() }
  }
}

// ─── Resolution ──────────────────────────────────────────────────────────────

/// How a persisted winner was determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WinnerMethod {
  /// Read from the save file.
  File,
  /// Taken from the override table.
  ManualOverride,
}

/// The winner row for one match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchWinner {
  pub player_id: PlayerId,
  pub method:    WinnerMethod,
  /// The override's stated reason; `None` for file-derived winners.
  pub reason:    Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WinnerResolution {
  Resolved(MatchWinner),
  Unresolved,
}

impl WinnerResolution {
  fn from_candidate(candidate: Option<PlayerId>) -> Self {
    match candidate {
      Some(player_id) => Self::Resolved(MatchWinner {
        player_id,
        method: WinnerMethod::File,
        reason: None,
      }),
      None => Self::Unresolved,
    }
  }

  pub fn winner(&self) -> Option<&MatchWinner> {
    match self {
      Self::Resolved(winner) => Some(winner),
      Self::Unresolved => None,
    }
  }
}

/// An override naming a player who did not play in the match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverrideMismatch {
  pub attempted: String,
  pub available: Vec<String>,
}

/// Find the override's named player on the roster by exact display name.
pub fn match_override(
  entry: &WinnerOverride,
  roster: &[PersistedPlayer],
) -> Result<PlayerId, OverrideMismatch> {
  roster
    .iter()
    .find(|p| p.name == entry.winner_player_name)
    .map(|p| p.player_id)
    .ok_or_else(|| OverrideMismatch {
      attempted: entry.winner_player_name.clone(),
      available: roster.iter().map(|p| p.name.clone()).collect(),
    })
}

/// Decide the winner of one match.
///
/// `match_label` only identifies the match in log output. `candidate` is the
/// file-derived winner, already translated to a persisted id.
pub fn resolve_winner(
  match_label: &str,
  external_id: Option<&str>,
  overrides: &OverrideTable,
  roster: &[PersistedPlayer],
  candidate: Option<PlayerId>,
) -> WinnerResolution {
  let Some(entry) = external_id.and_then(|id| overrides.get(id)) else {
    return WinnerResolution::from_candidate(candidate);
  };

  match match_override(entry, roster) {
    Ok(player_id) => {
      tracing::info!(
        match_label,
        winner = %entry.winner_player_name,
        reason = %entry.reason,
        "applying winner override"
      );
      WinnerResolution::Resolved(MatchWinner {
        player_id,
        method: WinnerMethod::ManualOverride,
        reason: Some(entry.reason.clone()),
      })
    }
    Err(mismatch) => {
      tracing::error!(
        match_label,
        external_id,
        attempted = %mismatch.attempted,
        available = ?mismatch.available,
        "winner override names a player not in this match; using file winner"
      );
      WinnerResolution::from_candidate(candidate)
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::LocalIndex;

  fn roster() -> Vec<PersistedPlayer> {
    vec![
      PersistedPlayer {
        player_id:   PlayerId(11),
        local_index: LocalIndex(1),
        name:        "Hatshepsut".into(),
      },
      PersistedPlayer {
        player_id:   PlayerId(12),
        local_index: LocalIndex(2),
        name:        "Cyrus".into(),
      },
    ]
  }

  fn overrides_for(external_id: &str, name: &str) -> OverrideTable {
    let mut table = OverrideTable::default();
    table.insert(external_id, WinnerOverride {
      winner_player_name: name.into(),
      reason:             "opponent conceded in chat".into(),
      date:               None,
      notes:              None,
    });
    table
  }

  #[test]
  fn no_override_uses_file_candidate() {
    let resolved = resolve_winner(
      "m",
      Some("426504721"),
      &OverrideTable::default(),
      &roster(),
      Some(PlayerId(12)),
    );
    assert_eq!(
      resolved,
      WinnerResolution::Resolved(MatchWinner {
        player_id: PlayerId(12),
        method:    WinnerMethod::File,
        reason:    None,
      })
    );
  }

  #[test]
  fn no_override_and_no_candidate_is_unresolved() {
    let resolved = resolve_winner("m", None, &OverrideTable::default(), &roster(), None);
    assert_eq!(resolved, WinnerResolution::Unresolved);
    assert!(resolved.winner().is_none());
  }

  #[test]
  fn override_hit_beats_file_candidate() {
    let table = overrides_for("426504721", "Hatshepsut");
    let resolved =
      resolve_winner("m", Some("426504721"), &table, &roster(), Some(PlayerId(12)));
    let winner = resolved.winner().unwrap();
    assert_eq!(winner.player_id, PlayerId(11));
    assert_eq!(winner.method, WinnerMethod::ManualOverride);
    assert_eq!(winner.reason.as_deref(), Some("opponent conceded in chat"));
  }

  #[test]
  fn override_miss_falls_back_to_file_candidate() {
    let table = overrides_for("426504721", "Nebuchadnezzar");
    let resolved =
      resolve_winner("m", Some("426504721"), &table, &roster(), Some(PlayerId(12)));
    let winner = resolved.winner().unwrap();
    assert_eq!(winner.player_id, PlayerId(12));
    assert_eq!(winner.method, WinnerMethod::File);
  }

  #[test]
  fn override_miss_without_candidate_is_unresolved() {
    let table = overrides_for("426504721", "Nebuchadnezzar");
    let resolved = resolve_winner("m", Some("426504721"), &table, &roster(), None);
    assert_eq!(resolved, WinnerResolution::Unresolved);
  }

  #[test]
  fn override_for_other_match_is_ignored() {
    let table = overrides_for("1", "Hatshepsut");
    let resolved = resolve_winner("m", Some("2"), &table, &roster(), Some(PlayerId(12)));
    assert_eq!(resolved.winner().unwrap().method, WinnerMethod::File);
  }

  #[test]
  fn names_match_exactly() {
    let entry = WinnerOverride {
      winner_player_name: "cyrus ".into(),
      reason:             "typo".into(),
      date:               None,
      notes:              None,
    };
    let mismatch = match_override(&entry, &roster()).unwrap_err();
    assert_eq!(mismatch.attempted, "cyrus ");
    assert_eq!(mismatch.available, vec!["Hatshepsut", "Cyrus"]);
  }
}
