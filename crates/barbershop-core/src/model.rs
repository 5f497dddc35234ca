// Domain types shared by the editor, the stores, and the UI.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Number of slots in a personal ranking.
pub const MAX_SLOTS: usize = 10;

/// Maximum number of players returned by a single catalog search.
pub const SEARCH_PAGE_SIZE: usize = 50;

/// Number of consensus rows shown by the collective ranking view.
pub const COLLECTIVE_TOP_N: usize = 10;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Opaque catalog identifier for a player.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub String);

impl PlayerId {
    pub fn new(id: impl Into<String>) -> Self {
        PlayerId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Stable identifier of an authenticated user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        UserId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Catalog records
// ---------------------------------------------------------------------------

/// A read-only catalog entry. Only `name` is guaranteed to be present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    #[serde(default)]
    pub team: Option<String>,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl Player {
    /// "Team • Position" with a dash standing in for missing values.
    pub fn subtitle(&self) -> String {
        format!(
            "{} • {}",
            self.team.as_deref().unwrap_or("—"),
            self.position.as_deref().unwrap_or("—")
        )
    }
}

// ---------------------------------------------------------------------------
// Ranking rows
// ---------------------------------------------------------------------------

/// One persisted (user, position) -> player pairing.
///
/// `player_id` is nullable in storage; such rows are skipped on hydrate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankingSlot {
    pub user_id: UserId,
    #[serde(rename = "rank_position")]
    pub position: u8,
    pub player_id: Option<PlayerId>,
}

impl RankingSlot {
    pub fn new(user_id: UserId, position: u8, player_id: PlayerId) -> Self {
        RankingSlot {
            user_id,
            position,
            player_id: Some(player_id),
        }
    }
}

/// One row of the community consensus, derived from every user's slots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectiveRankingRow {
    pub player_id: PlayerId,
    /// Mean slot position across all users who ranked the player. Lower is better.
    pub avg_rank: f64,
    /// Number of distinct users who ranked the player.
    pub vote_count: u32,
    /// Dense 1-based ordinal by ascending `avg_rank`.
    pub collective_rank: u32,
    /// Display record joined from the catalog, when known.
    pub player: Option<Player>,
}

impl CollectiveRankingRow {
    pub fn display_name(&self) -> &str {
        self.player
            .as_ref()
            .map(|p| p.name.as_str())
            .unwrap_or(self.player_id.as_str())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
