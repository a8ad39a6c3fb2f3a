//! Streaming extraction of match entities from a save document.
//!
//! Pipeline:
//!   xml bytes
//!     └─ quick-xml events
//!          └─ element path stack   (`Root/Player/YieldRateHistory/YIELD_FOOD/T12`)
//!               └─ classify()      → samples, ownership events, metadata
//!                    └─ finish()   → ExtractedMatch
//!
//! Only the parts of the document the pipeline needs are kept; everything
//! else is skipped without being buffered.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use quick_xml::{Reader, events::{BytesStart, Event}};
use strum::IntoEnumIterator as _;
use tourney_core::{
  metric::{MetricFamily, Sample},
  model::{
    ExtractedMatch, LocalIndex, MatchMeta, Owner, OwnershipEvent, PlayerRecord, TileId,
    TileRecord, Turn,
  },
  reconstruct::Change,
};

use crate::error::{Error, Result};

/// Owner value the game writes for "nobody".
const NO_OWNER: i64 = -1;

// ─── Element names ───────────────────────────────────────────────────────────

const PLAYER: &str = "Player";
const TILE: &str = "Tile";
const GAME: &str = "Game";
const OWNER_HISTORY: &str = "OwnerHistory";

/// History element under `<Player>` holding each metric family.
fn family_for_element(name: &str) -> Option<MetricFamily> {
  match name {
    "YieldRateHistory" => Some(MetricFamily::Yield),
    "PointsHistory" => Some(MetricFamily::Points),
    "MilitaryPowerHistory" => Some(MetricFamily::Military),
    "LegitimacyHistory" => Some(MetricFamily::Legitimacy),
    "FamilyOpinionHistory" => Some(MetricFamily::FamilyOpinion),
    "ReligionOpinionHistory" => Some(MetricFamily::ReligionOpinion),
    _ => None,
  }
}

// ─── Low-level helpers ───────────────────────────────────────────────────────

fn local_name(e: &BytesStart<'_>) -> String {
  String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

fn attributes(e: &BytesStart<'_>) -> Result<HashMap<String, String>> {
  let mut map = HashMap::new();
  for attr in e.attributes() {
    let attr = attr.map_err(|err| Error::Xml(err.to_string()))?;
    let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
    let value = attr
      .unescape_value()
      .map_err(|err| Error::Xml(err.to_string()))?
      .into_owned();
    map.insert(key, value);
  }
  Ok(map)
}

fn parse_number<T: std::str::FromStr>(context: &str, value: &str) -> Result<T> {
  value.trim().parse().map_err(|_| Error::InvalidNumber {
    context: context.to_owned(),
    value:   value.to_owned(),
  })
}

/// `T12` → 12.
fn parse_turn_tag(tag: &str) -> Result<Turn> {
  tag
    .strip_prefix('T')
    .and_then(|n| n.parse().ok())
    .ok_or_else(|| Error::InvalidTurnTag(tag.to_owned()))
}

fn non_empty(value: Option<&String>) -> Option<String> {
  value.filter(|v| !v.is_empty()).cloned()
}

// ─── Text routing ────────────────────────────────────────────────────────────

/// What a text node means, decided by the path of elements enclosing it.
enum TextTarget {
  Terrain,
  Height,
  Ownership(Turn),
  Sample {
    family:   MetricFamily,
    category: Option<String>,
    turn:     Turn,
  },
  FinalTurn,
  WinningTeam,
  Ignored,
}

fn classify(path: &[String]) -> Result<TextTarget> {
  let path: Vec<&str> = path.iter().map(String::as_str).collect();

  let target = match path.as_slice() {
    [_, TILE, "Terrain"] => TextTarget::Terrain,
    [_, TILE, "Height"] => TextTarget::Height,
    [_, TILE, OWNER_HISTORY, turn] => TextTarget::Ownership(parse_turn_tag(turn)?),
    [_, PLAYER, history, turn] => match family_for_element(history) {
      Some(family) if !family.is_categorized() => TextTarget::Sample {
        family,
        category: None,
        turn: parse_turn_tag(turn)?,
      },
      _ => TextTarget::Ignored,
    },
    [_, PLAYER, history, category, turn] => match family_for_element(history) {
      Some(family) if family.is_categorized() => TextTarget::Sample {
        family,
        category: Some((*category).to_owned()),
        turn: parse_turn_tag(turn)?,
      },
      _ => TextTarget::Ignored,
    },
    [_, GAME, "Turn"] => TextTarget::FinalTurn,
    [_, GAME, "TeamVictoriesCompleted", "Team"] => TextTarget::WinningTeam,
    _ => TextTarget::Ignored,
  };
  Ok(target)
}

// ─── Extractor state ─────────────────────────────────────────────────────────

struct TileInProgress {
  id:      TileId,
  terrain: Option<String>,
  height:  Option<String>,
}

#[derive(Default)]
struct Extractor {
  /// Local names of the currently open elements, root first.
  path:          Vec<String>,
  meta:          Option<MatchMeta>,
  players:       Vec<PlayerRecord>,
  player:        Option<LocalIndex>,
  tiles:         Vec<TileRecord>,
  tile:          Option<TileInProgress>,
  ownership:     BTreeMap<TileId, Vec<OwnershipEvent>>,
  metrics:       BTreeMap<MetricFamily, Vec<Sample>>,
  families_seen: BTreeSet<MetricFamily>,
  final_turn:    Option<Turn>,
  winning_team:  Option<u32>,
}

impl Extractor {
  fn map_width(&self) -> u32 { self.meta.as_ref().map_or(0, |m| m.map_width) }

  fn open(&mut self, e: &BytesStart<'_>) -> Result<()> {
    let name = local_name(e);

    match self.path.len() {
      0 => self.open_root(e)?,
      1 if name == PLAYER => self.open_player(e)?,
      1 if name == TILE => self.open_tile(e)?,
      2 if self.path[1] == PLAYER => {
        if let Some(family) = family_for_element(&name) {
          self.families_seen.insert(family);
        }
      }
      _ => {}
    }

    self.path.push(name);
    Ok(())
  }

  fn close(&mut self) {
    let Some(name) = self.path.pop() else { return };
    if self.path.len() != 1 {
      return;
    }
    if name == TILE {
      if let Some(tile) = self.tile.take() {
        let width = self.map_width();
        self
          .tiles
          .push(TileRecord::new(tile.id, width, tile.terrain, tile.height));
      }
    } else if name == PLAYER {
      self.player = None;
    }
  }

  fn open_root(&mut self, e: &BytesStart<'_>) -> Result<()> {
    let attrs = attributes(e)?;
    let width = attrs.get("MapWidth").ok_or(Error::MissingAttribute {
      element:   "Root",
      attribute: "MapWidth",
    })?;
    let map_width: u32 = parse_number("MapWidth", width)?;
    if map_width == 0 {
      return Err(Error::InvalidNumber {
        context: "MapWidth".into(),
        value:   width.clone(),
      });
    }

    self.meta = Some(MatchMeta {
      game_id: non_empty(attrs.get("GameId")),
      game_name: non_empty(attrs.get("GameName")),
      save_date: non_empty(attrs.get("SaveDate")),
      map_class: non_empty(attrs.get("MapClass")),
      map_size: non_empty(attrs.get("MapSize")),
      map_width,
      final_turn: 0,
    });
    Ok(())
  }

  fn open_player(&mut self, e: &BytesStart<'_>) -> Result<()> {
    let attrs = attributes(e)?;
    let id: u32 = parse_number(
      "Player ID",
      attrs.get("ID").ok_or(Error::MissingAttribute {
        element:   "Player",
        attribute: "ID",
      })?,
    )?;
    let team = attrs
      .get("Team")
      .map(|t| parse_number::<u32>("Player Team", t))
      .transpose()?;

    let local_index = LocalIndex::from_source_id(id).ok_or_else(|| Error::InvalidNumber {
      context: "Player ID".into(),
      value:   id.to_string(),
    })?;
    self.players.push(PlayerRecord {
      local_index,
      name: attrs.get("Name").cloned().unwrap_or_default(),
      nation: non_empty(attrs.get("Nation")),
      team,
    });
    self.player = Some(local_index);
    Ok(())
  }

  fn open_tile(&mut self, e: &BytesStart<'_>) -> Result<()> {
    let attrs = attributes(e)?;
    let id: u32 = parse_number(
      "Tile ID",
      attrs.get("ID").ok_or(Error::MissingAttribute {
        element:   "Tile",
        attribute: "ID",
      })?,
    )?;
    self.tile = Some(TileInProgress { id: TileId(id), terrain: None, height: None });
    Ok(())
  }

  fn text(&mut self, text: &str) -> Result<()> {
    match classify(&self.path)? {
      TextTarget::Terrain => {
        if let Some(tile) = self.tile.as_mut() {
          tile.terrain = Some(text.to_owned());
        }
      }
      TextTarget::Height => {
        if let Some(tile) = self.tile.as_mut() {
          tile.height = Some(text.to_owned());
        }
      }
      TextTarget::Ownership(turn) => self.ownership_change(turn, text)?,
      TextTarget::Sample { family, category, turn } => {
        self.sample(family, category, turn, text)?;
      }
      TextTarget::FinalTurn => {
        self.final_turn = Some(parse_number("Game Turn", text)?);
      }
      TextTarget::WinningTeam => {
        if self.winning_team.is_none() {
          self.winning_team = Some(parse_number("TeamVictoriesCompleted", text)?);
        }
      }
      TextTarget::Ignored => {}
    }
    Ok(())
  }

  fn ownership_change(&mut self, turn: Turn, text: &str) -> Result<()> {
    let Some(tile) = self.tile.as_ref() else { return Ok(()) };
    let value: i64 = parse_number("OwnerHistory", text)?;
    let owner = match value {
      NO_OWNER => Owner::Nobody,
      v if v >= 0 => Owner::Player(
        u32::try_from(v)
          .ok()
          .and_then(LocalIndex::from_source_id)
          .ok_or(Error::InvalidOwner { tile: tile.id.0, value: v })?,
      ),
      v => return Err(Error::InvalidOwner { tile: tile.id.0, value: v }),
    };
    self
      .ownership
      .entry(tile.id)
      .or_default()
      .push(Change::new(turn, owner));
    Ok(())
  }

  fn sample(
    &mut self,
    family: MetricFamily,
    category: Option<String>,
    turn: Turn,
    text: &str,
  ) -> Result<()> {
    let Some(player) = self.player else { return Ok(()) };
    let value: i64 = parse_number(family.as_ref(), text)?;
    self.metrics.entry(family).or_default().push(Sample {
      player,
      turn,
      category,
      value,
    });
    Ok(())
  }

  fn finish(mut self) -> Result<ExtractedMatch> {
    let mut meta = self.meta.take().ok_or(Error::MissingElement("Root"))?;
    meta.final_turn = self.final_turn.ok_or(Error::MissingElement("Game/Turn"))?;

    self.players.sort_by_key(|p| p.local_index);
    for (position, player) in self.players.iter().enumerate() {
      let expected = u32::try_from(position).unwrap_or(u32::MAX);
      let found = player.local_index.0.saturating_sub(1);
      if found < expected {
        return Err(Error::DuplicatePlayer(found));
      }
      if found > expected {
        return Err(Error::PlayerGap { expected, found });
      }
    }

    self.tiles.sort_by_key(|t| t.id);
    for events in self.ownership.values_mut() {
      events.sort_by_key(|e| e.turn);
    }

    for family in MetricFamily::iter() {
      if !self.families_seen.contains(&family) {
        tracing::info!(%family, "no history recorded for metric family");
      }
      self.metrics.entry(family).or_default();
    }

    let winner_candidate = self.winning_team.and_then(|team| {
      self
        .players
        .iter()
        .find(|p| p.team.unwrap_or(p.local_index.0.saturating_sub(1)) == team)
        .map(|p| p.local_index)
    });

    tracing::debug!(
      players = self.players.len(),
      tiles = self.tiles.len(),
      final_turn = meta.final_turn,
      "extracted save document"
    );

    Ok(ExtractedMatch {
      meta,
      players: self.players,
      tiles: self.tiles,
      ownership: self.ownership,
      metrics: self.metrics,
      winner_candidate,
    })
  }
}

// ─── Entry point ─────────────────────────────────────────────────────────────

/// Extract all match entities from a save document.
pub(crate) fn extract(xml: &[u8]) -> Result<ExtractedMatch> {
  let mut reader = Reader::from_reader(xml);
  reader.config_mut().trim_text(true);

  let mut extractor = Extractor::default();
  let mut buf = Vec::new();

  loop {
    match reader.read_event_into(&mut buf) {
      Ok(Event::Start(ref e)) => extractor.open(e)?,
      Ok(Event::Empty(ref e)) => {
        extractor.open(e)?;
        extractor.close();
      }
      Ok(Event::End(_)) => extractor.close(),
      Ok(Event::Text(ref t)) => {
        let text = t.unescape().map_err(|e| Error::Xml(e.to_string()))?;
        extractor.text(&text)?;
      }
      Ok(Event::Eof) => break,
      Err(e) => return Err(Error::Xml(e.to_string())),
      _ => {}
    }
    buf.clear();
  }

  extractor.finish()
}
