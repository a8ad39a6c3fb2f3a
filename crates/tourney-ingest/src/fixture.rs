//! Save archives built in memory for tests.

use std::{
  collections::BTreeMap,
  fmt::Write as _,
  io::{Cursor, Write as _},
};

use zip::{ZipWriter, write::SimpleFileOptions};

struct HistoryFixture {
  player:   u32,
  element:  &'static str,
  category: Option<&'static str>,
  points:   Vec<(u32, i64)>,
}

/// Builder for a minimal save document. Player and owner ids are the
/// zero-based ids the game writes.
pub struct SaveBuilder {
  map_width:    u32,
  final_turn:   u32,
  game_name:    Option<String>,
  players:      Vec<(u32, String)>,
  tiles:        u32,
  ownership:    BTreeMap<u32, Vec<(u32, i64)>>,
  histories:    Vec<HistoryFixture>,
  winning_team: Option<u32>,
}

impl SaveBuilder {
  pub fn new(map_width: u32, final_turn: u32) -> Self {
    Self {
      map_width,
      final_turn,
      game_name: None,
      players: Vec::new(),
      tiles: 0,
      ownership: BTreeMap::new(),
      histories: Vec::new(),
      winning_team: None,
    }
  }

  pub fn game_name(mut self, name: &str) -> Self {
    self.game_name = Some(name.into());
    self
  }

  pub fn player(mut self, id: u32, name: &str) -> Self {
    self.players.push((id, name.into()));
    self
  }

  /// Tiles `0..count`.
  pub fn tiles(mut self, count: u32) -> Self {
    self.tiles = count;
    self
  }

  /// Replace the owner history of one tile.
  pub fn ownership(mut self, tile: u32, changes: &[(u32, i64)]) -> Self {
    self.ownership.insert(tile, changes.to_vec());
    self
  }

  pub fn sample(
    mut self,
    player: u32,
    element: &'static str,
    category: Option<&'static str>,
    points: &[(u32, i64)],
  ) -> Self {
    self.histories.push(HistoryFixture { player, element, category, points: points.to_vec() });
    self
  }

  pub fn winning_team(mut self, team: u32) -> Self {
    self.winning_team = Some(team);
    self
  }

  pub fn to_xml(&self) -> String {
    let mut xml = String::from(r#"<?xml version="1.0" encoding="utf-8"?>"#);
    let _ = write!(xml, r#"<Root MapWidth="{}""#, self.map_width);
    if let Some(name) = &self.game_name {
      let _ = write!(xml, r#" GameName="{name}""#);
    }
    xml.push('>');

    for (id, name) in &self.players {
      let _ = write!(xml, r#"<Player ID="{id}" Name="{name}">"#);
      for history in self.histories.iter().filter(|h| h.player == *id) {
        let _ = write!(xml, "<{}>", history.element);
        if let Some(category) = history.category {
          let _ = write!(xml, "<{category}>");
        }
        for (turn, value) in &history.points {
          let _ = write!(xml, "<T{turn}>{value}</T{turn}>");
        }
        if let Some(category) = history.category {
          let _ = write!(xml, "</{category}>");
        }
        let _ = write!(xml, "</{}>", history.element);
      }
      xml.push_str("</Player>");
    }

    for tile in 0..self.tiles {
      let _ = write!(xml, r#"<Tile ID="{tile}"><Terrain>TERRAIN_GRASSLAND</Terrain>"#);
      if let Some(changes) = self.ownership.get(&tile) {
        xml.push_str("<OwnerHistory>");
        for (turn, owner) in changes {
          let _ = write!(xml, "<T{turn}>{owner}</T{turn}>");
        }
        xml.push_str("</OwnerHistory>");
      }
      xml.push_str("</Tile>");
    }

    let _ = write!(xml, "<Game><Turn>{}</Turn>", self.final_turn);
    if let Some(team) = self.winning_team {
      let _ = write!(xml, "<TeamVictoriesCompleted><Team>{team}</Team></TeamVictoriesCompleted>");
    }
    xml.push_str("</Game></Root>");
    xml
  }
}

/// Zip a save document the way the game exports it.
pub fn zip_save(save: &SaveBuilder) -> Vec<u8> {
  let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
  writer
    .start_file("OW-Save-Auto-1.xml", SimpleFileOptions::default())
    .unwrap();
  writer.write_all(save.to_xml().as_bytes()).unwrap();
  writer.finish().unwrap().into_inner()
}
