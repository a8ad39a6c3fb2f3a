//! Loading the curated winner-override file.
//!
//! The file is a JSON object keyed by external match id:
//!
//! ```json
//! {
//!   "_comment": "keys starting with _ or # are ignored",
//!   "426504721": {
//!     "winner_player_name": "Cyrus",
//!     "reason": "opponent conceded in chat",
//!     "date": "2025-03-14"
//!   }
//! }
//! ```

use std::path::Path;

use serde_json::{Map, Value};
use tourney_core::winner::{OverrideTable, WinnerOverride};

use crate::{Error, Result};

fn is_comment(key: &str) -> bool { key.starts_with('_') || key.starts_with('#') }

/// Parse override JSON. Entries that are not objects or lack a required
/// field are skipped with a warning; a document that is not a JSON object
/// is an error.
pub fn parse_overrides(json: &str) -> Result<OverrideTable> {
  let document: Map<String, Value> = serde_json::from_str(json)?;

  let table = document
    .into_iter()
    .filter(|(key, _)| !is_comment(key))
    .filter_map(|(external_id, value)| {
      match serde_json::from_value::<WinnerOverride>(value) {
        Ok(entry) => Some((external_id, entry)),
        Err(e) => {
          tracing::warn!(%external_id, error = %e, "skipping invalid winner override");
          None
        }
      }
    })
    .collect::<OverrideTable>();

  tracing::debug!(entries = table.len(), "parsed winner overrides");
  Ok(table)
}

pub async fn load_overrides(path: &Path) -> Result<OverrideTable> {
  let json = tokio::fs::read_to_string(path)
    .await
    .map_err(|source| Error::Read { path: path.to_path_buf(), source })?;
  let table = parse_overrides(&json)?;
  tracing::info!(path = %path.display(), entries = table.len(), "loaded winner overrides");
  Ok(table)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_entries_and_skips_comments() {
    let table = parse_overrides(
      r##"{
        "_comment": "ignored",
        "#note": { "winner_player_name": "x", "reason": "y" },
        "426504721": {
          "winner_player_name": "Cyrus",
          "reason": "opponent conceded",
          "date": "2025-03-14",
          "notes": "confirmed by both players"
        },
        "426504722": { "winner_player_name": "Hatshepsut", "reason": "disconnect" }
      }"##,
    )
    .unwrap();

    assert_eq!(table.len(), 2);
    let entry = table.get("426504721").unwrap();
    assert_eq!(entry.winner_player_name, "Cyrus");
    assert_eq!(entry.date.as_deref(), Some("2025-03-14"));
    assert!(table.get("426504722").unwrap().notes.is_none());
    assert!(table.get("#note").is_none());
  }

  #[test]
  fn invalid_entries_are_skipped() {
    let table = parse_overrides(
      r#"{
        "1": "Cyrus",
        "2": { "reason": "no name" },
        "3": { "winner_player_name": "Cyrus", "reason": "ok" }
      }"#,
    )
    .unwrap();
    assert_eq!(table.len(), 1);
    assert!(table.get("3").is_some());
  }

  #[test]
  fn non_object_document_is_an_error() {
    assert!(matches!(parse_overrides("[1, 2]"), Err(Error::Overrides(_))));
    assert!(matches!(parse_overrides("{"), Err(Error::Overrides(_))));
  }

  #[tokio::test]
  async fn missing_file_reports_its_path() {
    let err = load_overrides(Path::new("/nonexistent/overrides.json"))
      .await
      .unwrap_err();
    assert!(matches!(err, Error::Read { .. }));
    assert!(err.to_string().contains("/nonexistent/overrides.json"));
  }
}
