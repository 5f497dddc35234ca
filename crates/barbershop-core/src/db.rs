// SQLite persistence layer: player catalog, per-user rankings, consensus.

use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use async_trait::async_trait;
use rusqlite::{params, params_from_iter, Connection, ErrorCode};
use tracing::{debug, info};

use crate::error::{CatalogError, StoreError};
use crate::model::{CollectiveRankingRow, Player, PlayerId, RankingSlot, UserId};
use crate::store::{Aggregator, Catalog, RankingStore, ReplaceError};

/// SQLite-backed catalog, ranking store, and aggregator in one file.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) a SQLite database at `path` and ensure all tables
    /// exist. Pass `":memory:"` for an ephemeral in-memory database (useful
    /// for tests).
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {path}"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;
             PRAGMA foreign_keys = ON;",
        )
        .context("failed to set database pragmas")?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS players (
                id        TEXT PRIMARY KEY,
                name      TEXT NOT NULL,
                team      TEXT,
                position  TEXT,
                image_url TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_players_name ON players(name);

            CREATE TABLE IF NOT EXISTS user_rankings (
                user_id       TEXT NOT NULL,
                player_id     TEXT REFERENCES players(id),
                rank_position INTEGER NOT NULL CHECK (rank_position BETWEEN 1 AND 10),
                created_at    TEXT NOT NULL,
                updated_at    TEXT NOT NULL,
                UNIQUE(user_id, rank_position),
                UNIQUE(user_id, player_id)
            );
            ",
        )
        .context("failed to create database schema")?;

        debug!(path, "Database opened");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Acquire the database connection.
    ///
    /// Panics if the mutex is poisoned (another thread panicked while
    /// holding the lock).
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("database mutex poisoned")
    }

    // -----------------------------------------------------------------------
    // Players
    // -----------------------------------------------------------------------

    /// Insert or update players in a single transaction. Returns the number
    /// of rows written.
    pub fn import_players(&self, players: &[Player]) -> Result<usize> {
        let mut conn = self.conn();
        let tx = conn.transaction().context("failed to begin import transaction")?;

        for p in players {
            tx.execute(
                "INSERT INTO players (id, name, team, position, image_url)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(id) DO UPDATE SET
                    name      = excluded.name,
                    team      = excluded.team,
                    position  = excluded.position,
                    image_url = excluded.image_url",
                params![p.id.as_str(), p.name, p.team, p.position, p.image_url],
            )
            .with_context(|| format!("failed to upsert player {}", p.id))?;
        }

        tx.commit().context("failed to commit player import")?;
        info!(count = players.len(), "Imported players");
        Ok(players.len())
    }

    pub fn player_count(&self) -> Result<usize> {
        let count: i64 = self
            .conn()
            .query_row("SELECT COUNT(*) FROM players", [], |row| row.get(0))
            .context("failed to count players")?;
        Ok(count as usize)
    }

    /// Case-insensitive substring search over name, team, and position,
    /// ordered by name.
    pub fn search_players(&self, query: &str, limit: usize) -> Result<Vec<Player>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                r"SELECT id, name, team, position, image_url FROM players
                  WHERE name LIKE ?1 ESCAPE '\'
                     OR team LIKE ?1 ESCAPE '\'
                     OR position LIKE ?1 ESCAPE '\'
                  ORDER BY name, id
                  LIMIT ?2",
            )
            .context("failed to prepare player search")?;

        let players = stmt
            .query_map(params![like_pattern(query), limit as i64], player_from_row)
            .context("failed to search players")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map player rows")?;
        Ok(players)
    }

    pub fn players_by_ids(&self, ids: &[PlayerId]) -> Result<Vec<Player>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!(
            "SELECT id, name, team, position, image_url FROM players WHERE id IN ({placeholders})"
        );
        let conn = self.conn();
        let mut stmt = conn.prepare(&sql).context("failed to prepare player lookup")?;
        let players = stmt
            .query_map(params_from_iter(ids.iter().map(PlayerId::as_str)), player_from_row)
            .context("failed to look up players")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map player rows")?;
        Ok(players)
    }

    // -----------------------------------------------------------------------
    // Rankings
    // -----------------------------------------------------------------------

    /// A user's persisted slots, ordered by position.
    pub fn load_rankings(&self, user_id: &UserId) -> Result<Vec<RankingSlot>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT user_id, rank_position, player_id FROM user_rankings
                 WHERE user_id = ?1 ORDER BY rank_position",
            )
            .context("failed to prepare rankings query")?;
        let slots = stmt
            .query_map(params![user_id.as_str()], slot_from_row)
            .context("failed to query rankings")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map ranking rows")?;
        Ok(slots)
    }

    pub fn delete_rankings(&self, user_id: &UserId) -> Result<usize> {
        let deleted = self
            .conn()
            .execute(
                "DELETE FROM user_rankings WHERE user_id = ?1",
                params![user_id.as_str()],
            )
            .context("failed to delete rankings")?;
        Ok(deleted)
    }

    /// Insert slots all-or-nothing.
    pub fn insert_rankings(&self, slots: &[RankingSlot]) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction().context("failed to begin insert transaction")?;
        insert_slots(&tx, slots)?;
        tx.commit().context("failed to commit rankings")?;
        Ok(())
    }

    /// Delete the user's rows and write `slots` in one transaction. On any
    /// failure the previous rows are left in place.
    pub fn replace_rankings(&self, user_id: &UserId, slots: &[RankingSlot]) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction().context("failed to begin replace transaction")?;
        tx.execute(
            "DELETE FROM user_rankings WHERE user_id = ?1",
            params![user_id.as_str()],
        )
        .context("failed to delete rankings")?;
        insert_slots(&tx, slots)?;
        tx.commit().context("failed to commit rankings")?;
        debug!(user = %user_id, slots = slots.len(), "Rankings replaced");
        Ok(())
    }

    /// Every persisted slot in insertion order.
    pub fn all_rankings(&self) -> Result<Vec<RankingSlot>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare("SELECT user_id, rank_position, player_id FROM user_rankings ORDER BY rowid")
            .context("failed to prepare all-rankings query")?;
        let slots = stmt
            .query_map([], slot_from_row)
            .context("failed to query all rankings")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map ranking rows")?;
        Ok(slots)
    }

    /// Consensus computed in SQL: mean position per player, distinct voter
    /// count, ties broken by the earliest row mentioning the player.
    pub fn collective(&self, limit: usize) -> Result<Vec<CollectiveRankingRow>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT r.player_id,
                        AVG(r.rank_position)      AS avg_rank,
                        COUNT(DISTINCT r.user_id) AS vote_count,
                        MIN(r.rowid)              AS first_seen,
                        p.name, p.team, p.position, p.image_url
                 FROM user_rankings r
                 LEFT JOIN players p ON p.id = r.player_id
                 WHERE r.player_id IS NOT NULL
                 GROUP BY r.player_id
                 ORDER BY avg_rank ASC, first_seen ASC
                 LIMIT ?1",
            )
            .context("failed to prepare consensus query")?;

        let rows = stmt
            .query_map(params![limit as i64], |row| {
                let player_id = PlayerId::new(row.get::<_, String>(0)?);
                let name: Option<String> = row.get(4)?;
                let player = match name {
                    Some(name) => Some(Player {
                        id: player_id.clone(),
                        name,
                        team: row.get(5)?,
                        position: row.get(6)?,
                        image_url: row.get(7)?,
                    }),
                    None => None,
                };
                Ok(CollectiveRankingRow {
                    player_id,
                    avg_rank: row.get(1)?,
                    vote_count: row.get(2)?,
                    collective_rank: 0,
                    player,
                })
            })
            .context("failed to run consensus query")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map consensus rows")?;

        Ok(rows
            .into_iter()
            .enumerate()
            .map(|(i, mut row)| {
                row.collective_rank = (i + 1) as u32;
                row
            })
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Row helpers
// ---------------------------------------------------------------------------

fn player_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Player> {
    Ok(Player {
        id: PlayerId::new(row.get::<_, String>(0)?),
        name: row.get(1)?,
        team: row.get(2)?,
        position: row.get(3)?,
        image_url: row.get(4)?,
    })
}

fn slot_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RankingSlot> {
    Ok(RankingSlot {
        user_id: UserId::new(row.get::<_, String>(0)?),
        position: row.get(1)?,
        player_id: row.get::<_, Option<String>>(2)?.map(PlayerId::new),
    })
}

fn insert_slots(tx: &rusqlite::Transaction<'_>, slots: &[RankingSlot]) -> Result<()> {
    let now = chrono::Utc::now().to_rfc3339();
    for slot in slots {
        tx.execute(
            "INSERT INTO user_rankings (user_id, player_id, rank_position, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)",
            params![
                slot.user_id.as_str(),
                slot.player_id.as_ref().map(PlayerId::as_str),
                slot.position,
                now,
            ],
        )
        .with_context(|| format!("failed to insert slot {} for {}", slot.position, slot.user_id))?;
    }
    Ok(())
}

/// `%query%` with LIKE wildcards in the query escaped.
fn like_pattern(query: &str) -> String {
    let escaped = query
        .trim()
        .replace('\\', r"\\")
        .replace('%', r"\%")
        .replace('_', r"\_");
    format!("%{escaped}%")
}

fn is_constraint(e: &anyhow::Error) -> bool {
    matches!(
        e.downcast_ref::<rusqlite::Error>(),
        Some(rusqlite::Error::SqliteFailure(err, _)) if err.code == ErrorCode::ConstraintViolation
    )
}

fn store_error(e: anyhow::Error) -> StoreError {
    if is_constraint(&e) {
        StoreError::Constraint(format!("{e:#}"))
    } else {
        StoreError::Other(format!("{e:#}"))
    }
}

fn catalog_error(e: anyhow::Error) -> CatalogError {
    CatalogError::Other(format!("{e:#}"))
}

// ---------------------------------------------------------------------------
// Trait impls
// ---------------------------------------------------------------------------

#[async_trait]
impl Catalog for Database {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Player>, CatalogError> {
        self.search_players(query, limit).map_err(catalog_error)
    }

    async fn lookup(&self, ids: &[PlayerId]) -> Result<Vec<Player>, CatalogError> {
        self.players_by_ids(ids).map_err(catalog_error)
    }
}

#[async_trait]
impl RankingStore for Database {
    async fn read_all(&self, user_id: &UserId) -> Result<Vec<RankingSlot>, StoreError> {
        self.load_rankings(user_id).map_err(store_error)
    }

    async fn delete_all(&self, user_id: &UserId) -> Result<(), StoreError> {
        self.delete_rankings(user_id).map(|_| ()).map_err(store_error)
    }

    async fn insert_many(&self, slots: &[RankingSlot]) -> Result<(), StoreError> {
        self.insert_rankings(slots).map_err(store_error)
    }

    async fn replace_all(&self, user_id: &UserId, slots: &[RankingSlot]) -> Result<(), ReplaceError> {
        self.replace_rankings(user_id, slots)
            .map_err(|e| ReplaceError::Unchanged(store_error(e)))
    }
}

#[async_trait]
impl Aggregator for Database {
    async fn collective_rankings(&self, limit: usize) -> Result<Vec<CollectiveRankingRow>, StoreError> {
        self.collective(limit).map_err(store_error)
    }

    async fn all_slots(&self) -> Result<Vec<RankingSlot>, StoreError> {
        self.all_rankings().map_err(store_error)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
