// Community consensus: mean slot position per player across all users.
//
// Ordering is ascending mean position; ties keep the order in which each
// player first appears in the raw rows. Ranks are dense and 1-based.

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use crate::error::RankingError;
use crate::model::{CollectiveRankingRow, PlayerId, RankingSlot, UserId};
use crate::store::{Aggregator, Catalog};

/// Running totals for one player, in first-appearance order.
struct Tally<'a> {
    player_id: &'a PlayerId,
    position_sum: u64,
    rows: u64,
    voters: HashSet<&'a UserId>,
}

/// Compute the top `limit` consensus rows from raw slots. Display records
/// are left empty; see [`collective_top`] for the joined version.
pub fn aggregate(slots: &[RankingSlot], limit: usize) -> Vec<CollectiveRankingRow> {
    let mut index: HashMap<&PlayerId, usize> = HashMap::new();
    let mut tallies: Vec<Tally> = Vec::new();

    for slot in slots {
        let Some(player_id) = slot.player_id.as_ref() else {
            continue;
        };
        let i = *index.entry(player_id).or_insert_with(|| {
            tallies.push(Tally {
                player_id,
                position_sum: 0,
                rows: 0,
                voters: HashSet::new(),
            });
            tallies.len() - 1
        });
        let tally = &mut tallies[i];
        tally.position_sum += u64::from(slot.position);
        tally.rows += 1;
        tally.voters.insert(&slot.user_id);
    }

    let mut rows: Vec<CollectiveRankingRow> = tallies
        .into_iter()
        .map(|t| CollectiveRankingRow {
            player_id: t.player_id.clone(),
            avg_rank: t.position_sum as f64 / t.rows as f64,
            vote_count: t.voters.len() as u32,
            collective_rank: 0,
            player: None,
        })
        .collect();

    // Stable sort keeps first-appearance order among equal means.
    rows.sort_by(|a, b| a.avg_rank.total_cmp(&b.avg_rank));
    rows.truncate(limit);
    for (i, row) in rows.iter_mut().enumerate() {
        row.collective_rank = (i + 1) as u32;
    }
    rows
}

/// Top `limit` consensus rows with display records.
///
/// Prefers the backend's own computation; if that fails, recomputes from the
/// raw rows in memory and joins player details through the catalog.
pub async fn collective_top(
    aggregator: &dyn Aggregator,
    catalog: &dyn Catalog,
    limit: usize,
) -> Result<Vec<CollectiveRankingRow>, RankingError> {
    match aggregator.collective_rankings(limit).await {
        Ok(rows) => return Ok(rows),
        Err(e) => warn!(error = %e, "Server-side aggregation unavailable, falling back to raw rows"),
    }

    let slots = aggregator
        .all_slots()
        .await
        .map_err(RankingError::StoreUnavailable)?;
    let mut rows = aggregate(&slots, limit);
    debug!(slots = slots.len(), rows = rows.len(), "Aggregated consensus locally");

    let ids: Vec<PlayerId> = rows.iter().map(|r| r.player_id.clone()).collect();
    if ids.is_empty() {
        return Ok(rows);
    }
    match catalog.lookup(&ids).await {
        Ok(players) => {
            let mut by_id: HashMap<PlayerId, _> =
                players.into_iter().map(|p| (p.id.clone(), p)).collect();
            for row in &mut rows {
                row.player = by_id.remove(&row.player_id);
            }
        }
        Err(e) => warn!(error = %e, "Could not load player details for consensus rows"),
    }
    Ok(rows)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
