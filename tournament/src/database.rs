// ═══════════════════════════════════════════════════════════════════════
// Database — SQLite storage for tournament results and ELO ratings
// ═══════════════════════════════════════════════════════════════════════

use std::collections::BTreeSet;
use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension, Transaction};
use serde::Serialize;
use tracing::debug;

use crate::runner::{Decision, GameResult};

pub const STARTING_ELO: f64 = 1500.0;
/// ELO K-factor applied per winner/loser pairing.
pub const ELO_K: f64 = 32.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardEntry {
    pub name: String,
    pub elo: f64,
    pub games: u32,
    pub wins: u32,
}

pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) a database at the given path.
    pub fn open(path: impl AsRef<Path>) -> rusqlite::Result<Self> {
        let db = Database { conn: Connection::open(path)? };
        db.create_schema()?;
        Ok(db)
    }

    /// In-memory database (useful for tests).
    pub fn in_memory() -> rusqlite::Result<Self> {
        let db = Database { conn: Connection::open_in_memory()? };
        db.create_schema()?;
        Ok(db)
    }

    fn create_schema(&self) -> rusqlite::Result<()> {
        self.conn.execute_batch("
            CREATE TABLE IF NOT EXISTS agents (
                id          INTEGER PRIMARY KEY,
                name        TEXT NOT NULL UNIQUE,
                elo         REAL NOT NULL DEFAULT 1500.0,
                games       INTEGER NOT NULL DEFAULT 0,
                wins        INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS games (
                id          INTEGER PRIMARY KEY,
                seed        INTEGER NOT NULL,
                turns       INTEGER NOT NULL,
                winner      TEXT NOT NULL,
                decided_by  TEXT NOT NULL,
                result      TEXT NOT NULL,
                played_at   TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE IF NOT EXISTS game_players (
                id          INTEGER PRIMARY KEY,
                game_id     INTEGER NOT NULL REFERENCES games(id),
                agent_id    INTEGER NOT NULL REFERENCES agents(id),
                seat        INTEGER NOT NULL,
                cities      INTEGER NOT NULL,
                tiles       INTEGER NOT NULL,
                warriors    INTEGER NOT NULL,
                tech        INTEGER NOT NULL,
                eliminated  INTEGER NOT NULL,
                rejected    INTEGER NOT NULL
            );
        ")
    }

    /// Register an agent (or return existing ID).
    pub fn register_agent(&self, name: &str) -> rusqlite::Result<i64> {
        register_agent(&self.conn, name)
    }

    /// Store a completed game, update per-agent stats and ratings in one
    /// transaction. Returns the game id.
    pub fn record_game(&mut self, result: &GameResult) -> rusqlite::Result<i64> {
        let tx = self.conn.transaction()?;

        let winner_name = result.winner_result().map_or_else(String::new, |p| p.agent_name.clone());
        let decided_by = match result.decided_by {
            Decision::Victory => "victory",
            Decision::Tiebreak => "tiebreak",
        };
        let json = serde_json::to_string(result).map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
        tx.execute(
            "INSERT INTO games (seed, turns, winner, decided_by, result) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![result.seed as i64, result.turns_played, winner_name, decided_by, json],
        )?;
        let game_id = tx.last_insert_rowid();

        let mut agent_ids = BTreeSet::new();
        let mut winner_id = None;
        for pr in &result.player_results {
            let agent_id = register_agent(&tx, &pr.agent_name)?;
            agent_ids.insert(agent_id);
            if pr.player == result.winner {
                winner_id = Some(agent_id);
            }
            tx.execute(
                "INSERT INTO game_players (game_id, agent_id, seat, cities, tiles, warriors, tech, eliminated, rejected)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    game_id,
                    agent_id,
                    pr.player.0,
                    pr.cities as i64,
                    pr.tiles as i64,
                    pr.warriors as i64,
                    pr.tech_score,
                    pr.eliminated,
                    pr.rejected,
                ],
            )?;
        }

        // An agent seated twice plays and wins the game once.
        for &agent_id in &agent_ids {
            tx.execute(
                "UPDATE agents SET games = games + 1, wins = wins + ?1 WHERE id = ?2",
                params![i64::from(Some(agent_id) == winner_id), agent_id],
            )?;
        }
        if let Some(winner_id) = winner_id {
            let losers: Vec<i64> = agent_ids.into_iter().filter(|&id| id != winner_id).collect();
            update_elo(&tx, winner_id, &losers, ELO_K)?;
        }

        tx.commit()?;
        debug!(game_id, seed = result.seed, winner = %winner_name, "game stored");
        Ok(game_id)
    }

    /// A stored game, as it was recorded.
    pub fn game_result(&self, game_id: i64) -> rusqlite::Result<Option<GameResult>> {
        let json: Option<String> = self.conn
            .query_row("SELECT result FROM games WHERE id = ?1", params![game_id], |row| row.get(0))
            .optional()?;
        json.map(|j| {
            serde_json::from_str(&j)
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e)))
        })
        .transpose()
    }

    pub fn elo(&self, name: &str) -> rusqlite::Result<Option<f64>> {
        self.conn
            .query_row("SELECT elo FROM agents WHERE name = ?1", params![name], |row| row.get(0))
            .optional()
    }

    /// Get ELO leaderboard.
    pub fn leaderboard(&self) -> rusqlite::Result<Vec<LeaderboardEntry>> {
        let mut stmt = self.conn.prepare("SELECT name, elo, games, wins FROM agents ORDER BY elo DESC, name")?;
        let rows = stmt.query_map([], |row| {
            Ok(LeaderboardEntry {
                name: row.get(0)?,
                elo: row.get(1)?,
                games: row.get(2)?,
                wins: row.get(3)?,
            })
        })?;
        rows.collect()
    }

    /// Get total number of games stored.
    pub fn game_count(&self) -> rusqlite::Result<u32> {
        self.conn.query_row("SELECT COUNT(*) FROM games", [], |row| row.get(0))
    }
}

fn register_agent(conn: &Connection, name: &str) -> rusqlite::Result<i64> {
    conn.execute("INSERT OR IGNORE INTO agents (name, elo) VALUES (?1, ?2)", params![name, STARTING_ELO])?;
    conn.query_row("SELECT id FROM agents WHERE name = ?1", params![name], |row| row.get(0))
}

/// Multiplayer ELO: the winner is scored against each loser in turn.
fn update_elo(tx: &Transaction<'_>, winner_id: i64, loser_ids: &[i64], k: f64) -> rusqlite::Result<()> {
    let rating = |id: i64| -> rusqlite::Result<f64> {
        tx.query_row("SELECT elo FROM agents WHERE id = ?1", params![id], |row| row.get(0))
    };

    for &loser_id in loser_ids {
        let winner_elo = rating(winner_id)?;
        let loser_elo = rating(loser_id)?;
        let expected_winner = expected_score(winner_elo, loser_elo);
        let delta = k * (1.0 - expected_winner);

        tx.execute("UPDATE agents SET elo = elo + ?1 WHERE id = ?2", params![delta, winner_id])?;
        tx.execute("UPDATE agents SET elo = elo - ?1 WHERE id = ?2", params![delta, loser_id])?;
    }
    Ok(())
}

/// Expected score of a player rated `a` against one rated `b`.
pub fn expected_score(a: f64, b: f64) -> f64 {
    1.0 / (1.0 + 10f64.powf((b - a) / 400.0))
}
