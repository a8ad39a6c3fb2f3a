//! Encoding and decoding helpers between domain types and SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings. Identifiers are stored as their
//! raw integers. Bulk rows are bound as borrowed [`ToSqlOutput`] values so
//! large batches do not copy their text columns.

use chrono::{DateTime, Utc};
use rusqlite::types::{ToSqlOutput, Value, ValueRef};
use tourney_core::{
  metric::MetricFamily,
  model::{MatchId, PlayerId, Turn},
  winner::{MatchWinner, WinnerMethod},
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── WinnerMethod ────────────────────────────────────────────────────────────

pub fn encode_method(m: WinnerMethod) -> &'static str {
  match m {
    WinnerMethod::File => "file",
    WinnerMethod::ManualOverride => "manual_override",
  }
}

pub fn decode_method(s: &str) -> Result<WinnerMethod> {
  match s {
    "file" => Ok(WinnerMethod::File),
    "manual_override" => Ok(WinnerMethod::ManualOverride),
    other => Err(Error::UnknownWinnerMethod(other.to_owned())),
  }
}

// ─── Metric family tables ────────────────────────────────────────────────────

/// Where one metric family lives.
#[derive(Debug, Clone, Copy)]
pub struct FamilyTable {
  pub table:    &'static str,
  /// Category column for families broken down by yield type, family, or
  /// religion.
  pub category: Option<&'static str>,
  pub value:    &'static str,
}

pub fn family_table(family: MetricFamily) -> FamilyTable {
  let (table, category, value) = match family {
    MetricFamily::Yield => ("yield_history", Some("yield_type"), "amount"),
    MetricFamily::Points => ("points_history", None, "points"),
    MetricFamily::Military => ("military_history", None, "military_power"),
    MetricFamily::Legitimacy => ("legitimacy_history", None, "legitimacy"),
    MetricFamily::FamilyOpinion => ("family_opinion_history", Some("family"), "opinion"),
    MetricFamily::ReligionOpinion => ("religion_opinion_history", Some("religion"), "opinion"),
  };
  FamilyTable { table, category, value }
}

// ─── Bound values ────────────────────────────────────────────────────────────

pub fn int(v: impl Into<i64>) -> ToSqlOutput<'static> {
  ToSqlOutput::Owned(Value::Integer(v.into()))
}

pub fn opt_int(v: Option<impl Into<i64>>) -> ToSqlOutput<'static> {
  v.map_or(ToSqlOutput::Owned(Value::Null), int)
}

pub fn text(v: &str) -> ToSqlOutput<'_> { ToSqlOutput::Borrowed(ValueRef::Text(v.as_bytes())) }

pub fn opt_text(v: Option<&str>) -> ToSqlOutput<'_> {
  v.map_or(ToSqlOutput::Owned(Value::Null), text)
}

pub fn player(id: PlayerId) -> ToSqlOutput<'static> { int(id.0) }

pub fn opt_player(id: Option<PlayerId>) -> ToSqlOutput<'static> { opt_int(id.map(|p| p.0)) }

/// `INSERT INTO table (match_id, c1, c2) VALUES (?1, ?2, ?3), (?1, ?4, ?5), …`
///
/// The match id is bound once as `?1` and shared by every row.
pub fn multi_row_insert(table: &str, columns: &[&str], rows: usize) -> String {
  let width = columns.len();
  let tuples: Vec<String> = (0..rows)
    .map(|row| {
      let slots: Vec<String> = (0..width)
        .map(|col| format!("?{}", 2 + row * width + col))
        .collect();
      format!("(?1, {})", slots.join(", "))
    })
    .collect();
  format!(
    "INSERT INTO {table} (match_id, {}) VALUES {}",
    columns.join(", "),
    tuples.join(", ")
  )
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// A persisted match as read back from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMatch {
  pub match_id:     MatchId,
  pub external_id:  Option<String>,
  pub content_hash: String,
  pub file_name:    String,
  pub game_name:    Option<String>,
  pub map_width:    u32,
  pub total_turns:  Turn,
  pub imported_at:  DateTime<Utc>,
}

/// Raw column values read directly from a `matches` row.
pub struct RawMatch {
  pub match_id:     i64,
  pub external_id:  Option<String>,
  pub content_hash: String,
  pub file_name:    String,
  pub game_name:    Option<String>,
  pub map_width:    u32,
  pub total_turns:  u32,
  pub imported_at:  String,
}

impl RawMatch {
  pub fn into_match(self) -> Result<StoredMatch> {
    Ok(StoredMatch {
      match_id:     MatchId(self.match_id),
      external_id:  self.external_id,
      content_hash: self.content_hash,
      file_name:    self.file_name,
      game_name:    self.game_name,
      map_width:    self.map_width,
      total_turns:  self.total_turns,
      imported_at:  decode_dt(&self.imported_at)?,
    })
  }
}

/// Raw column values read directly from a `match_winners` row.
pub struct RawWinner {
  pub player_id: i64,
  pub method:    String,
  pub reason:    Option<String>,
}

impl RawWinner {
  pub fn into_winner(self) -> Result<MatchWinner> {
    Ok(MatchWinner {
      player_id: PlayerId(self.player_id),
      method:    decode_method(&self.method)?,
      reason:    self.reason,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn multi_row_statement_shares_match_id() {
    let sql = multi_row_insert("points_history", &["player_id", "turn", "points"], 2);
    assert_eq!(
      sql,
      "INSERT INTO points_history (match_id, player_id, turn, points) \
       VALUES (?1, ?2, ?3, ?4), (?1, ?5, ?6, ?7)"
    );
  }

  #[test]
  fn method_round_trips_through_text() {
    for method in [WinnerMethod::File, WinnerMethod::ManualOverride] {
      assert_eq!(decode_method(encode_method(method)).unwrap(), method);
    }
    assert!(decode_method("coin_flip").is_err());
  }

  #[test]
  fn categorized_families_have_category_columns() {
    use strum::IntoEnumIterator as _;
    for family in MetricFamily::iter() {
      assert_eq!(family_table(family).category.is_some(), family.is_categorized());
    }
  }
}
