//! Temporal metric families recorded per player per turn.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter};

use crate::model::{LocalIndex, Turn};

/// A family of per-turn player samples.
///
/// Values are kept exactly as the game wrote them. In particular yield
/// amounts are fixed-point at ten times their display magnitude, and
/// legitimacy and opinion values routinely fall outside 0..=100.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
  AsRefStr,
  Display,
  EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MetricFamily {
  /// Yield production rate, one series per yield type.
  Yield,
  /// Victory points.
  Points,
  /// Military strength.
  Military,
  Legitimacy,
  /// Opinion of each family towards its ruler.
  FamilyOpinion,
  /// Opinion of each religion towards the player.
  ReligionOpinion,
}

impl MetricFamily {
  /// Whether samples in this family carry a category (yield type, family,
  /// religion) in addition to the player.
  pub fn is_categorized(self) -> bool {
    matches!(self, Self::Yield | Self::FamilyOpinion | Self::ReligionOpinion)
  }
}

/// One raw per-turn sample, still keyed by the file-local player index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
  pub player:   LocalIndex,
  pub turn:     Turn,
  pub category: Option<String>,
  pub value:    i64,
}

#[cfg(test)]
mod tests {
  use strum::IntoEnumIterator as _;

  use super::*;

  #[test]
  fn families_render_snake_case() {
    let names: Vec<String> = MetricFamily::iter().map(|f| f.to_string()).collect();
    assert_eq!(
      names,
      [
        "yield",
        "points",
        "military",
        "legitimacy",
        "family_opinion",
        "religion_opinion"
      ]
    );
  }

  #[test]
  fn only_breakdown_families_are_categorized() {
    assert!(MetricFamily::Yield.is_categorized());
    assert!(MetricFamily::ReligionOpinion.is_categorized());
    assert!(!MetricFamily::Points.is_categorized());
    assert!(!MetricFamily::Legitimacy.is_categorized());
  }
}
