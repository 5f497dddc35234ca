// Player catalog seed data: a CSV with columns id,name,team,position,image_url.
//
// Only `id` and `name` are required. Blank optional cells become `None`.

use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::db::Database;
use crate::model::{Player, PlayerId};

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: String, source: csv::Error },

    #[error("failed to import players: {0:#}")]
    Import(anyhow::Error),
}

#[derive(Debug, Deserialize)]
struct RawPlayer {
    id: String,
    name: String,
    #[serde(default)]
    team: Option<String>,
    #[serde(default)]
    position: Option<String>,
    #[serde(default)]
    image_url: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse players from CSV. Malformed rows, blank ids or names, and repeated
/// ids are skipped with a warning.
fn load_players_from_reader<R: Read>(rdr: R) -> Result<Vec<Player>, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut seen = HashSet::new();
    let mut players = Vec::new();

    for result in reader.deserialize::<RawPlayer>() {
        let raw = match result {
            Ok(raw) => raw,
            Err(e) => {
                warn!("skipping malformed player row: {e}");
                continue;
            }
        };
        let id = raw.id.trim().to_string();
        let name = raw.name.trim().to_string();
        if id.is_empty() || name.is_empty() {
            warn!(id = %id, "skipping player row without id or name");
            continue;
        }
        if !seen.insert(id.clone()) {
            warn!(id = %id, "skipping duplicate player id");
            continue;
        }
        players.push(Player {
            id: PlayerId::new(id),
            name,
            team: non_blank(raw.team),
            position: non_blank(raw.position),
            image_url: non_blank(raw.image_url),
        });
    }
    Ok(players)
}

/// Load the players listed in a CSV file.
pub fn load_players(path: &Path) -> Result<Vec<Player>, SeedError> {
    let file = std::fs::File::open(path).map_err(|e| SeedError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    load_players_from_reader(file).map_err(|e| SeedError::Csv {
        path: path.display().to_string(),
        source: e,
    })
}

/// Fill an empty catalog from `path`. Does nothing when players already
/// exist. Returns the number of players imported.
pub fn seed_if_empty(db: &Database, path: &Path) -> Result<usize, SeedError> {
    if db.player_count().map_err(SeedError::Import)? > 0 {
        return Ok(0);
    }
    let players = load_players(path)?;
    let count = db.import_players(&players).map_err(SeedError::Import)?;
    info!(count, path = %path.display(), "Seeded player catalog");
    Ok(count)
}
