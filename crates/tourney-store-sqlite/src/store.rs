//! [`SqliteStore`] and [`SqliteWriter`], the SQLite implementation of
//! [`MatchWriter`] plus the read helpers used to inspect imported matches.

use std::{collections::BTreeMap, path::Path};

use rusqlite::{OptionalExtension as _, Transaction, TransactionBehavior, types::ToSqlOutput};
use strum::IntoEnumIterator as _;
use tourney_core::{
  metric::MetricFamily,
  model::{
    LocalIndex, MatchId, NewMatch, PersistedPlayer, PlayerId, PlayerRecord, ResolvedSample,
    TerritoryRow, TileId, TileRecord, Turn,
  },
  store::MatchWriter,
  winner::MatchWinner,
};

use crate::{
  Result,
  encode::{
    RawMatch, RawWinner, StoredMatch, encode_dt, encode_method, family_table, int,
    multi_row_insert, opt_player, opt_text, player,
  },
  schema::{MATCH_TABLES_CHILDREN_FIRST, SCHEMA},
};

/// Upper bound on rows per multi-row `INSERT`; keeps every statement well
/// under SQLite's bound-parameter limit.
const ROWS_PER_STATEMENT: usize = 500;

// ─── Read models ─────────────────────────────────────────────────────────────

/// A temporal sample as read back from one of the history tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredSample {
  pub player_id: PlayerId,
  pub turn:      Turn,
  pub category:  Option<String>,
  pub value:     i64,
}

/// Number of rows one match owns in each table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowCounts {
  pub players:     usize,
  pub tiles:       usize,
  pub territories: usize,
  pub samples:     BTreeMap<MetricFamily, usize>,
  pub winners:     usize,
}

impl RowCounts {
  pub fn total(&self) -> usize {
    self.players
      + self.tiles
      + self.territories
      + self.samples.values().sum::<usize>()
      + self.winners
  }
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A tournament match store backed by a single SQLite file.
///
/// Clones share one reference-counted connection, so transactions from
/// concurrent imports are serialized and never interleave.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, mainly for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run `f` against a [`SqliteWriter`] inside one immediate transaction.
  ///
  /// The transaction commits only when `f` returns `Ok`; on `Err` it is
  /// rolled back and the store is left exactly as it was. The outer `Result`
  /// carries database failures (including a failed commit), the inner one
  /// whatever `f` returned.
  pub async fn in_transaction<F, R, E>(&self, f: F) -> Result<Result<R, E>>
  where
    F: FnOnce(&mut SqliteWriter<'_>) -> Result<R, E> + Send + 'static,
    R: Send + 'static,
    E: Send + 'static,
  {
    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let outcome = f(&mut SqliteWriter { tx: &tx });
        if outcome.is_ok() {
          tx.commit()?;
        }
        Ok(outcome)
      })
      .await?;
    Ok(outcome)
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  pub async fn find_match_by_hash(&self, content_hash: &str) -> Result<Option<MatchId>> {
    let hash = content_hash.to_owned();
    let id: Option<i64> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT match_id FROM matches WHERE content_hash = ?1",
              rusqlite::params![hash],
              |r| r.get(0),
            )
            .optional()?,
        )
      })
      .await?;
    Ok(id.map(MatchId))
  }

  pub async fn get_match(&self, match_id: MatchId) -> Result<Option<StoredMatch>> {
    let raw: Option<RawMatch> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT match_id, external_id, content_hash, file_name, game_name,
                      map_width, total_turns, imported_at
               FROM matches WHERE match_id = ?1",
              rusqlite::params![match_id.0],
              |row| {
                Ok(RawMatch {
                  match_id:     row.get(0)?,
                  external_id:  row.get(1)?,
                  content_hash: row.get(2)?,
                  file_name:    row.get(3)?,
                  game_name:    row.get(4)?,
                  map_width:    row.get(5)?,
                  total_turns:  row.get(6)?,
                  imported_at:  row.get(7)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawMatch::into_match).transpose()
  }

  pub async fn count_matches(&self) -> Result<usize> {
    let n: i64 = self
      .conn
      .call(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM matches", [], |r| r.get(0))?))
      .await?;
    Ok(n as usize)
  }

  /// Players of a match in local-index order.
  pub async fn list_players(&self, match_id: MatchId) -> Result<Vec<PersistedPlayer>> {
    let rows: Vec<(i64, u32, String)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT player_id, local_index, name FROM players
           WHERE match_id = ?1 ORDER BY local_index",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![match_id.0], |r| {
            Ok((r.get(0)?, r.get(1)?, r.get(2)?))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(
      rows
        .into_iter()
        .map(|(id, local, name)| PersistedPlayer {
          player_id:   PlayerId(id),
          local_index: LocalIndex(local),
          name,
        })
        .collect(),
    )
  }

  pub async fn get_winner(&self, match_id: MatchId) -> Result<Option<MatchWinner>> {
    let raw: Option<RawWinner> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT winner_player_id, method, override_reason
               FROM match_winners WHERE match_id = ?1",
              rusqlite::params![match_id.0],
              |r| {
                Ok(RawWinner {
                  player_id: r.get(0)?,
                  method:    r.get(1)?,
                  reason:    r.get(2)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawWinner::into_winner).transpose()
  }

  /// Owner of one tile on every stored turn, in turn order.
  pub async fn territory_owners(
    &self,
    match_id: MatchId,
    tile: TileId,
  ) -> Result<Vec<(Turn, Option<PlayerId>)>> {
    let rows: Vec<(u32, Option<i64>)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT turn, owner_player_id FROM territories
           WHERE match_id = ?1 AND tile_id = ?2 ORDER BY turn",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![match_id.0, tile.0], |r| Ok((r.get(0)?, r.get(1)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(
      rows
        .into_iter()
        .map(|(turn, owner)| (turn, owner.map(PlayerId)))
        .collect(),
    )
  }

  /// Distinct non-null owners referenced by a match's territory rows.
  pub async fn territory_owner_ids(&self, match_id: MatchId) -> Result<Vec<PlayerId>> {
    let ids: Vec<i64> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT DISTINCT owner_player_id FROM territories
           WHERE match_id = ?1 AND owner_player_id IS NOT NULL
           ORDER BY owner_player_id",
        )?;
        let ids = stmt
          .query_map(rusqlite::params![match_id.0], |r| r.get(0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(ids)
      })
      .await?;
    Ok(ids.into_iter().map(PlayerId).collect())
  }

  pub async fn samples(&self, match_id: MatchId, family: MetricFamily) -> Result<Vec<StoredSample>> {
    let target = family_table(family);
    let sql = format!(
      "SELECT player_id, turn, {category}, {value} FROM {table}
       WHERE match_id = ?1 ORDER BY player_id, turn, 3",
      category = target.category.unwrap_or("NULL"),
      value = target.value,
      table = target.table,
    );

    let rows: Vec<(i64, u32, Option<String>, i64)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![match_id.0], |r| {
            Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(
      rows
        .into_iter()
        .map(|(player_id, turn, category, value)| StoredSample {
          player_id: PlayerId(player_id),
          turn,
          category,
          value,
        })
        .collect(),
    )
  }

  pub async fn row_counts(&self, match_id: MatchId) -> Result<RowCounts> {
    let counts = self
      .conn
      .call(move |conn| {
        let count = |table: &str| -> rusqlite::Result<usize> {
          let n: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {table} WHERE match_id = ?1"),
            rusqlite::params![match_id.0],
            |r| r.get(0),
          )?;
          Ok(n as usize)
        };

        let mut samples = BTreeMap::new();
        for family in MetricFamily::iter() {
          samples.insert(family, count(family_table(family).table)?);
        }

        Ok(RowCounts {
          players: count("players")?,
          tiles: count("tiles")?,
          territories: count("territories")?,
          samples,
          winners: count("match_winners")?,
        })
      })
      .await?;
    Ok(counts)
  }
}

// ─── Writer ──────────────────────────────────────────────────────────────────

/// A [`MatchWriter`] bound to one open transaction.
///
/// Only obtainable through [`SqliteStore::in_transaction`].
pub struct SqliteWriter<'t> {
  tx: &'t Transaction<'t>,
}

impl SqliteWriter<'_> {
  /// Insert `rows` into `table` in multi-row statements.
  fn insert_many<'r, R, const N: usize>(
    &self,
    table: &str,
    columns: [&str; N],
    match_id: MatchId,
    rows: &'r [R],
    bind: impl Fn(&'r R) -> [ToSqlOutput<'r>; N],
  ) -> rusqlite::Result<usize> {
    let match_param = int(match_id.0);
    let mut written = 0;

    for chunk in rows.chunks(ROWS_PER_STATEMENT) {
      let sql = multi_row_insert(table, &columns, chunk.len());
      let mut params: Vec<ToSqlOutput<'r>> = Vec::with_capacity(1 + chunk.len() * N);
      params.push(match_param.clone());
      for row in chunk {
        params.extend(bind(row));
      }

      let mut stmt = self.tx.prepare_cached(&sql)?;
      written += stmt.execute(rusqlite::params_from_iter(params.iter()))?;
    }

    Ok(written)
  }
}

impl MatchWriter for SqliteWriter<'_> {
  type Error = rusqlite::Error;

  fn find_match_by_hash(&mut self, content_hash: &str) -> rusqlite::Result<Option<MatchId>> {
    self
      .tx
      .query_row(
        "SELECT match_id FROM matches WHERE content_hash = ?1",
        rusqlite::params![content_hash],
        |r| r.get(0),
      )
      .optional()
      .map(|id| id.map(MatchId))
  }

  fn find_prior_versions(
    &mut self,
    external_id: Option<&str>,
    file_name: &str,
  ) -> rusqlite::Result<Vec<MatchId>> {
    let (sql, key) = match external_id {
      Some(id) => ("SELECT match_id FROM matches WHERE external_id = ?1 ORDER BY match_id", id),
      None => (
        "SELECT match_id FROM matches
         WHERE external_id IS NULL AND file_name = ?1 ORDER BY match_id",
        file_name,
      ),
    };
    let mut stmt = self.tx.prepare_cached(sql)?;
    let ids = stmt
      .query_map(rusqlite::params![key], |r| r.get(0).map(MatchId))?
      .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(ids)
  }

  fn delete_match(&mut self, match_id: MatchId) -> rusqlite::Result<()> {
    for table in MATCH_TABLES_CHILDREN_FIRST {
      let deleted = self.tx.execute(
        &format!("DELETE FROM {table} WHERE match_id = ?1"),
        rusqlite::params![match_id.0],
      )?;
      tracing::debug!(%match_id, table, deleted, "cleared match rows");
    }
    Ok(())
  }

  fn insert_match(&mut self, new_match: &NewMatch) -> rusqlite::Result<MatchId> {
    let meta = &new_match.meta;
    self.tx.execute(
      "INSERT INTO matches (
         external_id, content_hash, file_name, game_id, game_name, save_date,
         map_class, map_size, map_width, total_turns, imported_at
       ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
      rusqlite::params![
        new_match.external_id,
        new_match.content_hash,
        new_match.file_name,
        meta.game_id,
        meta.game_name,
        meta.save_date,
        meta.map_class,
        meta.map_size,
        meta.map_width,
        meta.final_turn,
        encode_dt(new_match.imported_at),
      ],
    )?;
    Ok(MatchId(self.tx.last_insert_rowid()))
  }

  fn insert_players(
    &mut self,
    match_id: MatchId,
    players: &[PlayerRecord],
  ) -> rusqlite::Result<Vec<PersistedPlayer>> {
    let mut stmt = self.tx.prepare_cached(
      "INSERT INTO players (match_id, local_index, name, nation, team)
       VALUES (?1, ?2, ?3, ?4, ?5)",
    )?;

    let mut persisted = Vec::with_capacity(players.len());
    for p in players {
      stmt.execute(rusqlite::params![match_id.0, p.local_index.0, p.name, p.nation, p.team])?;
      persisted.push(PersistedPlayer {
        player_id:   PlayerId(self.tx.last_insert_rowid()),
        local_index: p.local_index,
        name:        p.name.clone(),
      });
    }
    Ok(persisted)
  }

  fn insert_tiles(&mut self, match_id: MatchId, tiles: &[TileRecord]) -> rusqlite::Result<usize> {
    self.insert_many(
      "tiles",
      ["tile_id", "x", "y", "terrain", "height"],
      match_id,
      tiles,
      |t| {
        [
          int(t.id.0),
          int(t.x),
          int(t.y),
          opt_text(t.terrain.as_deref()),
          opt_text(t.height.as_deref()),
        ]
      },
    )
  }

  fn insert_territory(
    &mut self,
    match_id: MatchId,
    rows: &[TerritoryRow<'_>],
  ) -> rusqlite::Result<usize> {
    self.insert_many(
      "territories",
      ["tile_id", "turn", "owner_player_id", "terrain"],
      match_id,
      rows,
      |r| [int(r.tile_id.0), int(r.turn), opt_player(r.owner), opt_text(r.terrain)],
    )
  }

  fn insert_samples(
    &mut self,
    match_id: MatchId,
    family: MetricFamily,
    rows: &[ResolvedSample<'_>],
  ) -> rusqlite::Result<usize> {
    let target = family_table(family);
    match target.category {
      Some(category) => self.insert_many(
        target.table,
        ["player_id", "turn", category, target.value],
        match_id,
        rows,
        |s| [player(s.player_id), int(s.turn), opt_text(s.category), int(s.value)],
      ),
      None => self.insert_many(
        target.table,
        ["player_id", "turn", target.value],
        match_id,
        rows,
        |s| [player(s.player_id), int(s.turn), int(s.value)],
      ),
    }
  }

  fn insert_winner(&mut self, match_id: MatchId, winner: &MatchWinner) -> rusqlite::Result<()> {
    self.tx.execute(
      "INSERT INTO match_winners (match_id, winner_player_id, method, override_reason)
       VALUES (?1, ?2, ?3, ?4)",
      rusqlite::params![
        match_id.0,
        winner.player_id.0,
        encode_method(winner.method),
        winner.reason,
      ],
    )?;
    Ok(())
  }
}
