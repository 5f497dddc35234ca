// Catalog search contract: query normalization, page cap, de-duplication,
// and last-issued-query-wins sequencing for results that arrive out of order.

use std::collections::HashSet;

use tracing::debug;

use crate::error::RankingError;
use crate::model::{Player, SEARCH_PAGE_SIZE};
use crate::store::Catalog;

/// Search the catalog and apply the result contract: sorted by name, capped
/// at `limit` (never more than the page size), one entry per player id.
pub async fn search(
    catalog: &dyn Catalog,
    query: &str,
    limit: usize,
) -> Result<Vec<Player>, RankingError> {
    let query = query.trim();
    let limit = limit.clamp(1, SEARCH_PAGE_SIZE);
    let players = catalog.search(query, limit).await?;
    let mut players = dedupe_by_id(players);
    players.sort_by(|a, b| a.name.cmp(&b.name));
    players.truncate(limit);
    debug!(query, results = players.len(), "Catalog search complete");
    Ok(players)
}

/// Keep the first occurrence of each player id, preserving order.
pub fn dedupe_by_id(players: Vec<Player>) -> Vec<Player> {
    let mut seen = HashSet::new();
    players
        .into_iter()
        .filter(|p| seen.insert(p.id.clone()))
        .collect()
}

/// Case-insensitive substring match on name, team, or position. An empty
/// query matches everything.
pub fn matches_query(player: &Player, query: &str) -> bool {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }
    let hit = |field: Option<&str>| field.is_some_and(|v| v.to_lowercase().contains(&needle));
    hit(Some(&player.name)) || hit(player.team.as_deref()) || hit(player.position.as_deref())
}

/// Hands out increasing sequence numbers for searches and remembers the
/// newest one, so a late result for an older query can be recognized.
#[derive(Debug, Default)]
pub struct SearchSequence {
    latest: u64,
}

impl SearchSequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new search; any earlier search becomes stale.
    pub fn issue(&mut self) -> u64 {
        self.latest += 1;
        self.latest
    }

    pub fn is_current(&self, seq: u64) -> bool {
        seq == self.latest
    }

    pub fn latest(&self) -> u64 {
        self.latest
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CatalogError;
    use crate::model::PlayerId;
    use async_trait::async_trait;

    fn player(id: &str, name: &str, team: &str, pos: &str) -> Player {
        Player {
            id: PlayerId::new(id),
            name: name.into(),
            team: Some(team.into()),
            position: Some(pos.into()),
            image_url: None,
        }
    }

    /// Returns a fixed list and ignores the query, like a store that matched
    /// the same row through two columns.
    struct Overlapping(Vec<Player>);

    #[async_trait]
    impl Catalog for Overlapping {
        async fn search(&self, _query: &str, _limit: usize) -> Result<Vec<Player>, CatalogError> {
            Ok(self.0.clone())
        }

        async fn lookup(&self, _ids: &[PlayerId]) -> Result<Vec<Player>, CatalogError> {
            Ok(Vec::new())
        }
    }

    struct Down;

    #[async_trait]
    impl Catalog for Down {
        async fn search(&self, _query: &str, _limit: usize) -> Result<Vec<Player>, CatalogError> {
            Err(CatalogError::Rejected {
                status: 503,
                message: "maintenance".into(),
            })
        }

        async fn lookup(&self, _ids: &[PlayerId]) -> Result<Vec<Player>, CatalogError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn search_dedupes_and_sorts_by_name() {
        let lebron = player("1", "LeBron James", "LAL", "F");
        let catalog = Overlapping(vec![
            player("2", "Anthony Davis", "LAL", "F-C"),
            lebron.clone(),
            lebron,
        ]);
        let results = search(&catalog, "lal", 50).await.unwrap();
        let names: Vec<_> = results.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["Anthony Davis", "LeBron James"]);
    }

    #[tokio::test]
    async fn search_caps_at_page_size() {
        let many = (0..80)
            .map(|i| player(&format!("{i}"), &format!("Player {i:02}"), "BOS", "G"))
            .collect();
        let results = search(&Overlapping(many), "", 500).await.unwrap();
        assert_eq!(results.len(), SEARCH_PAGE_SIZE);
    }

    #[tokio::test]
    async fn catalog_failure_maps_to_catalog_unavailable() {
        let err = search(&Down, "curry", 50).await.unwrap_err();
        assert!(matches!(err, RankingError::CatalogUnavailable(_)));
    }

    #[test]
    fn matches_across_fields_case_insensitively() {
        let p = player("30", "Stephen Curry", "GSW", "PG");
        assert!(matches_query(&p, "curry"));
        assert!(matches_query(&p, "gsw"));
        assert!(matches_query(&p, "pg"));
        assert!(matches_query(&p, "  "));
        assert!(!matches_query(&p, "lakers"));
    }

    #[test]
    fn only_latest_sequence_is_current() {
        let mut seq = SearchSequence::new();
        let first = seq.issue();
        let second = seq.issue();
        assert!(!seq.is_current(first));
        assert!(seq.is_current(second));
    }
}
