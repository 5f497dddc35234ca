// Integration tests for the ranking core.
//
// These exercise the shipped defaults and seed data together with the
// editor, the SQLite store, catalog search, and consensus aggregation
// through the crate's public API.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use barbershop_core::aggregate::collective_top;
use barbershop_core::catalog;
use barbershop_core::config::{self, BackendKind};
use barbershop_core::db::Database;
use barbershop_core::editor::{EditorPolicy, RankingEditor, SaveOutcome};
use barbershop_core::model::{Player, COLLECTIVE_TOP_N, SEARCH_PAGE_SIZE};
use barbershop_core::seed;
use barbershop_core::session::Session;

// ===========================================================================
// Test helpers
// ===========================================================================

fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../..")
}

fn seeded_db() -> Database {
    let db = Database::open(":memory:").unwrap();
    let imported = seed::seed_if_empty(&db, &workspace_root().join("data/players.csv")).unwrap();
    assert!(imported > 0);
    db
}

fn find(db: &Database, name: &str) -> Player {
    db.search_players(name, 5)
        .unwrap()
        .into_iter()
        .find(|p| p.name == name)
        .unwrap_or_else(|| panic!("{name} missing from seed data"))
}

// ===========================================================================
// Shipped files
// ===========================================================================

#[test]
fn shipped_defaults_load_and_validate() {
    let base = std::env::temp_dir().join("barbershop_shipped_defaults");
    let _ = std::fs::remove_dir_all(&base);
    std::fs::create_dir_all(base.join("defaults")).unwrap();
    for name in ["barbershop.toml", "credentials.toml.example"] {
        std::fs::copy(
            workspace_root().join("defaults").join(name),
            base.join("defaults").join(name),
        )
        .unwrap();
    }

    let copied = config::ensure_config_files(&base).unwrap();
    assert_eq!(copied, vec![base.join("config/barbershop.toml")]);

    let config = config::load_config_from(&base).unwrap();
    assert_eq!(config.backend, BackendKind::Sqlite);
    assert_eq!(config.editor, EditorPolicy::default());
    assert_eq!(config.search.debounce_ms, 300);
    assert_eq!(config.search.page_size, SEARCH_PAGE_SIZE);
    assert_eq!(config.seed_csv.as_deref(), Some("data/players.csv"));

    let _ = std::fs::remove_dir_all(&base);
}

#[test]
fn seed_csv_has_unique_named_players() {
    let players = seed::load_players(&workspace_root().join("data/players.csv")).unwrap();
    assert!(players.len() > 2 * COLLECTIVE_TOP_N);
    let ids: HashSet<_> = players.iter().map(|p| p.id.clone()).collect();
    assert_eq!(ids.len(), players.len());
    assert!(players.iter().all(|p| p.team.is_some() && p.position.is_some()));
}

// ===========================================================================
// Editor against SQLite
// ===========================================================================

#[tokio::test]
async fn search_filters_across_team_and_position() {
    let db = seeded_db();

    let bos = catalog::search(&db, "bos", SEARCH_PAGE_SIZE).await.unwrap();
    let names: Vec<_> = bos.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, ["Jaylen Brown", "Jayson Tatum"]);

    let first_page = catalog::search(&db, "", SEARCH_PAGE_SIZE).await.unwrap();
    let mut sorted = first_page.clone();
    sorted.sort_by(|a, b| a.name.cmp(&b.name));
    assert_eq!(first_page, sorted);
}

#[tokio::test]
async fn full_list_replacement_then_save_and_consensus() {
    let db = seeded_db();
    let session = Session::from_email("Fan@Example.com").unwrap();
    let mut editor = RankingEditor::new(Some(session.clone()), EditorPolicy::default());

    let all = catalog::search(&db, "", SEARCH_PAGE_SIZE).await.unwrap();
    for player in all.iter().take(10).cloned() {
        editor.add(player).unwrap();
    }
    assert!(editor.is_full());

    // An 11th pick waits for a slot, then overwrites slot 10.
    let wemby = find(&db, "Victor Wembanyama");
    editor.add(wemby.clone()).unwrap();
    let placement = editor.assign(10).unwrap();
    assert_eq!(placement.displaced.as_ref(), Some(&all[9].id));

    editor.reorder(9, 0).unwrap();
    assert_eq!(editor.player_ids()[0], wemby.id);

    assert_eq!(editor.save(&db).await.unwrap(), SaveOutcome::Synced);
    assert!(!editor.is_dirty());

    let stored = db.load_rankings(&session.user_id).unwrap();
    assert_eq!(stored.len(), 10);
    assert_eq!(stored[0].player_id.as_ref(), Some(&wemby.id));

    let consensus = collective_top(&db, &db, COLLECTIVE_TOP_N).await.unwrap();
    assert_eq!(consensus.len(), 10);
    assert_eq!(consensus[0].display_name(), "Victor Wembanyama");
    assert!(consensus.iter().all(|r| r.vote_count == 1));

    // Coming back later hydrates the same order.
    let mut again = RankingEditor::new(Some(session.clone()), EditorPolicy::default());
    let slots = db.load_rankings(&session.user_id).unwrap();
    again.hydrate(&slots);
    assert_eq!(again.player_ids(), editor.player_ids());
}
