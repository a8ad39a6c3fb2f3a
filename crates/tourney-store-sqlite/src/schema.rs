//! SQL schema for the tournament SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
///
/// Every per-player table references `players(player_id, match_id)` rather
/// than `players(player_id)` alone, so a row can only ever point at a player
/// of its own match.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS matches (
    match_id      INTEGER PRIMARY KEY AUTOINCREMENT,
    external_id   TEXT,            -- tournament system id, when known
    content_hash  TEXT NOT NULL UNIQUE,
    file_name     TEXT NOT NULL,
    game_id       TEXT,
    game_name     TEXT,
    save_date     TEXT,
    map_class     TEXT,
    map_size      TEXT,
    map_width     INTEGER NOT NULL CHECK (map_width > 0),
    total_turns   INTEGER NOT NULL,
    imported_at   TEXT NOT NULL    -- RFC 3339 UTC
);

CREATE TABLE IF NOT EXISTS players (
    player_id    INTEGER PRIMARY KEY AUTOINCREMENT,
    match_id     INTEGER NOT NULL REFERENCES matches(match_id),
    local_index  INTEGER NOT NULL,  -- 1-based position in the save file
    name         TEXT NOT NULL,
    nation       TEXT,
    team         INTEGER,
    UNIQUE (match_id, local_index),
    UNIQUE (match_id, name),
    UNIQUE (player_id, match_id)
);

CREATE TABLE IF NOT EXISTS tiles (
    match_id  INTEGER NOT NULL REFERENCES matches(match_id),
    tile_id   INTEGER NOT NULL,
    x         INTEGER NOT NULL,
    y         INTEGER NOT NULL,
    terrain   TEXT,
    height    TEXT,
    PRIMARY KEY (match_id, tile_id)
);

-- One row per tile per turn, 1..total_turns.
CREATE TABLE IF NOT EXISTS territories (
    match_id         INTEGER NOT NULL,
    tile_id          INTEGER NOT NULL,
    turn             INTEGER NOT NULL CHECK (turn >= 1),
    owner_player_id  INTEGER,         -- NULL when unowned
    terrain          TEXT,
    PRIMARY KEY (match_id, tile_id, turn),
    FOREIGN KEY (match_id, tile_id) REFERENCES tiles(match_id, tile_id),
    FOREIGN KEY (owner_player_id, match_id) REFERENCES players(player_id, match_id)
);

-- Raw fixed-point amounts (10x display value); never rescaled here.
CREATE TABLE IF NOT EXISTS yield_history (
    match_id    INTEGER NOT NULL,
    player_id   INTEGER NOT NULL,
    turn        INTEGER NOT NULL,
    yield_type  TEXT NOT NULL,
    amount      INTEGER NOT NULL,
    PRIMARY KEY (match_id, player_id, turn, yield_type),
    FOREIGN KEY (player_id, match_id) REFERENCES players(player_id, match_id)
);

CREATE TABLE IF NOT EXISTS points_history (
    match_id   INTEGER NOT NULL,
    player_id  INTEGER NOT NULL,
    turn       INTEGER NOT NULL,
    points     INTEGER NOT NULL,
    PRIMARY KEY (match_id, player_id, turn),
    FOREIGN KEY (player_id, match_id) REFERENCES players(player_id, match_id)
);

CREATE TABLE IF NOT EXISTS military_history (
    match_id        INTEGER NOT NULL,
    player_id       INTEGER NOT NULL,
    turn            INTEGER NOT NULL,
    military_power  INTEGER NOT NULL,
    PRIMARY KEY (match_id, player_id, turn),
    FOREIGN KEY (player_id, match_id) REFERENCES players(player_id, match_id)
);

-- Unbounded: legitimacy regularly exceeds 100.
CREATE TABLE IF NOT EXISTS legitimacy_history (
    match_id    INTEGER NOT NULL,
    player_id   INTEGER NOT NULL,
    turn        INTEGER NOT NULL,
    legitimacy  INTEGER NOT NULL,
    PRIMARY KEY (match_id, player_id, turn),
    FOREIGN KEY (player_id, match_id) REFERENCES players(player_id, match_id)
);

-- Unbounded: opinions go negative and above 100.
CREATE TABLE IF NOT EXISTS family_opinion_history (
    match_id   INTEGER NOT NULL,
    player_id  INTEGER NOT NULL,
    turn       INTEGER NOT NULL,
    family     TEXT NOT NULL,
    opinion    INTEGER NOT NULL,
    PRIMARY KEY (match_id, player_id, turn, family),
    FOREIGN KEY (player_id, match_id) REFERENCES players(player_id, match_id)
);

CREATE TABLE IF NOT EXISTS religion_opinion_history (
    match_id   INTEGER NOT NULL,
    player_id  INTEGER NOT NULL,
    turn       INTEGER NOT NULL,
    religion   TEXT NOT NULL,
    opinion    INTEGER NOT NULL,
    PRIMARY KEY (match_id, player_id, turn, religion),
    FOREIGN KEY (player_id, match_id) REFERENCES players(player_id, match_id)
);

CREATE TABLE IF NOT EXISTS match_winners (
    match_id          INTEGER PRIMARY KEY REFERENCES matches(match_id),
    winner_player_id  INTEGER NOT NULL,
    method            TEXT NOT NULL CHECK (method IN ('file', 'manual_override')),
    override_reason   TEXT,
    FOREIGN KEY (winner_player_id, match_id) REFERENCES players(player_id, match_id)
);

CREATE INDEX IF NOT EXISTS matches_external_idx   ON matches(external_id);
CREATE INDEX IF NOT EXISTS territories_turn_idx   ON territories(match_id, turn);
CREATE INDEX IF NOT EXISTS territories_owner_idx  ON territories(owner_player_id);

PRAGMA user_version = 1;
";

/// Tables holding rows of one match, children before parents. Deleting in
/// this order never trips a foreign key.
pub const MATCH_TABLES_CHILDREN_FIRST: &[&str] = &[
  "match_winners",
  "yield_history",
  "points_history",
  "military_history",
  "legitimacy_history",
  "family_opinion_history",
  "religion_opinion_history",
  "territories",
  "tiles",
  "players",
  "matches",
];
