// Application state and orchestration logic.
//
// The central event loop owns the ranking editor and coordinates user
// commands from the TUI with results from spawned store/catalog tasks. Every
// change is pushed to the TUI as a `UiUpdate`.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use barbershop_core::aggregate::collective_top;
use barbershop_core::catalog::{self, SearchSequence};
use barbershop_core::config::SearchConfig;
use barbershop_core::editor::{execute_save, AddOutcome, EditorPolicy, RankingEditor, SaveOutcome};
use barbershop_core::error::RankingError;
use barbershop_core::model::{
    CollectiveRankingRow, Player, PlayerId, RankingSlot, UserId, COLLECTIVE_TOP_N,
};
use barbershop_core::protocol::{Notice, UiUpdate, UserCommand};
use barbershop_core::session::{Session, SessionStore};
use barbershop_core::store::{Aggregator, Catalog, RankingStore};

// ---------------------------------------------------------------------------
// Supporting types
// ---------------------------------------------------------------------------

/// The three collaborators, usually all backed by the same object.
#[derive(Clone)]
pub struct Backend {
    pub catalog: Arc<dyn Catalog>,
    pub store: Arc<dyn RankingStore>,
    pub aggregator: Arc<dyn Aggregator>,
}

impl Backend {
    /// Use one object for catalog, store, and aggregation.
    pub fn shared<B>(backend: Arc<B>) -> Self
    where
        B: Catalog + RankingStore + Aggregator + 'static,
    {
        Backend {
            catalog: backend.clone(),
            store: backend.clone(),
            aggregator: backend,
        }
    }
}

/// Results reported back to the event loop by spawned tasks.
#[derive(Debug)]
enum TaskEvent {
    Search {
        seq: u64,
        query: String,
        result: Result<Vec<Player>, RankingError>,
    },
    Saved {
        user_id: UserId,
        editor_generation: u64,
        revision: u64,
        result: Result<Vec<RankingSlot>, RankingError>,
    },
    Collective {
        generation: u64,
        result: Result<Vec<CollectiveRankingRow>, RankingError>,
    },
    Hydrated {
        editor_generation: u64,
        revision: u64,
        result: Result<(Vec<RankingSlot>, Vec<Player>), RankingError>,
    },
}

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

pub struct AppState {
    pub editor: RankingEditor,
    pub backend: Backend,
    pub policy: EditorPolicy,
    pub search: SearchConfig,
    /// Where the signed-in session is remembered. `None` keeps it in memory.
    pub sessions: Option<SessionStore>,
    search_seq: SearchSequence,
    /// Latest search text and when it becomes due.
    pending_query: Option<(String, Instant)>,
    /// Identifies the newest collective refresh; older results are dropped.
    collective_generation: u64,
    /// Bumped each time the editor is rebuilt on sign-in or sign-out.
    editor_generation: u64,
    /// Users with a save still running, whichever editor started it.
    saves_in_flight: HashSet<UserId>,
}

impl AppState {
    pub fn new(
        backend: Backend,
        policy: EditorPolicy,
        search: SearchConfig,
        session: Option<Session>,
        sessions: Option<SessionStore>,
    ) -> Self {
        AppState {
            editor: RankingEditor::new(session, policy),
            backend,
            policy,
            search,
            sessions,
            search_seq: SearchSequence::new(),
            pending_query: None,
            collective_generation: 0,
            editor_generation: 0,
            saves_in_flight: HashSet::new(),
        }
    }

    /// Swap in a fresh editor for `session`. Results addressed to the old
    /// editor are dropped from here on.
    fn replace_editor(&mut self, session: Option<Session>) {
        self.editor = RankingEditor::new(session, self.policy);
        self.editor_generation += 1;
    }

    fn debounce(&self) -> Duration {
        Duration::from_millis(self.search.debounce_ms)
    }

    fn user_id(&self) -> Option<UserId> {
        self.editor.session().map(|s| s.user_id.clone())
    }

    // -----------------------------------------------------------------------
    // Task spawning
    // -----------------------------------------------------------------------

    fn spawn_search(&mut self, query: String, task_tx: &mpsc::Sender<TaskEvent>) -> u64 {
        let seq = self.search_seq.issue();
        let players = Arc::clone(&self.backend.catalog);
        let limit = self.search.page_size;
        let tx = task_tx.clone();
        debug!(seq, query = %query, "Issuing catalog search");
        tokio::spawn(async move {
            let result = catalog::search(players.as_ref(), &query, limit).await;
            let _ = tx.send(TaskEvent::Search { seq, query, result }).await;
        });
        seq
    }

    fn spawn_collective(&mut self, task_tx: &mpsc::Sender<TaskEvent>) {
        self.collective_generation += 1;
        let generation = self.collective_generation;
        let aggregator = Arc::clone(&self.backend.aggregator);
        let catalog = Arc::clone(&self.backend.catalog);
        let tx = task_tx.clone();
        tokio::spawn(async move {
            let result = collective_top(aggregator.as_ref(), catalog.as_ref(), COLLECTIVE_TOP_N).await;
            let _ = tx.send(TaskEvent::Collective { generation, result }).await;
        });
    }

    /// Load the signed-in user's saved ranking plus player details.
    fn spawn_hydrate(&self, task_tx: &mpsc::Sender<TaskEvent>) {
        let Some(user_id) = self.user_id() else {
            return;
        };
        let editor_generation = self.editor_generation;
        let revision = self.editor.revision();
        let store = Arc::clone(&self.backend.store);
        let catalog = Arc::clone(&self.backend.catalog);
        let tx = task_tx.clone();
        tokio::spawn(async move {
            let result = load_ranking(store.as_ref(), catalog.as_ref(), &user_id).await;
            let _ = tx
                .send(TaskEvent::Hydrated {
                    editor_generation,
                    revision,
                    result,
                })
                .await;
        });
    }
}

async fn load_ranking(
    store: &dyn RankingStore,
    catalog: &dyn Catalog,
    user_id: &UserId,
) -> Result<(Vec<RankingSlot>, Vec<Player>), RankingError> {
    let slots = store
        .read_all(user_id)
        .await
        .map_err(RankingError::StoreUnavailable)?;
    let ids: Vec<PlayerId> = slots.iter().filter_map(|s| s.player_id.clone()).collect();
    let players = if ids.is_empty() {
        Vec::new()
    } else {
        match catalog.lookup(&ids).await {
            Ok(players) => players,
            Err(e) => {
                warn!(error = %e, "Could not load details for saved players");
                Vec::new()
            }
        }
    };
    Ok((slots, players))
}

// ---------------------------------------------------------------------------
// Main event loop
// ---------------------------------------------------------------------------

/// Run the main application event loop.
///
/// Listens with `tokio::select!` on:
/// 1. User commands from the TUI
/// 2. The debounce deadline of the pending search
/// 3. Results from spawned search, save, hydrate, and consensus tasks
///
/// Pushes UI updates through `ui_tx` for the TUI render loop.
pub async fn run(
    mut cmd_rx: mpsc::Receiver<UserCommand>,
    ui_tx: mpsc::Sender<UiUpdate>,
    mut state: AppState,
) -> anyhow::Result<()> {
    info!("Application event loop started");

    let (task_tx, mut task_rx) = mpsc::channel::<TaskEvent>(64);

    send_snapshot(&state, &ui_tx).await;
    state.spawn_hydrate(&task_tx);
    let _ = ui_tx.send(UiUpdate::CollectiveLoading).await;
    state.spawn_collective(&task_tx);
    let _ = ui_tx
        .send(UiUpdate::SearchLoading {
            query: String::new(),
        })
        .await;
    state.spawn_search(String::new(), &task_tx);

    loop {
        let deadline = state.pending_query.as_ref().map(|(_, at)| *at);

        tokio::select! {
            // --- User commands ---
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(UserCommand::Quit) => {
                        info!("Quit command received, shutting down");
                        break;
                    }
                    Some(cmd) => {
                        handle_user_command(&mut state, cmd, &ui_tx, &task_tx).await;
                    }
                    None => {
                        info!("Command channel closed, shutting down");
                        break;
                    }
                }
            }

            // --- Debounced search ---
            _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                if let Some((query, _)) = state.pending_query.take() {
                    let _ = ui_tx.send(UiUpdate::SearchLoading { query: query.clone() }).await;
                    state.spawn_search(query, &task_tx);
                }
            }

            // --- Spawned task results ---
            Some(event) = task_rx.recv() => {
                handle_task_event(&mut state, event, &ui_tx, &task_tx).await;
            }
        }
    }

    info!("Application event loop exiting");
    Ok(())
}

async fn send_snapshot(state: &AppState, ui_tx: &mpsc::Sender<UiUpdate>) {
    let _ = ui_tx
        .send(UiUpdate::Editor(Box::new(state.editor.snapshot())))
        .await;
}

async fn send_notice(ui_tx: &mpsc::Sender<UiUpdate>, notice: Notice) {
    let _ = ui_tx.send(UiUpdate::Notice(notice)).await;
}

/// Handle a user command from the TUI.
async fn handle_user_command(
    state: &mut AppState,
    cmd: UserCommand,
    ui_tx: &mpsc::Sender<UiUpdate>,
    task_tx: &mpsc::Sender<TaskEvent>,
) {
    match cmd {
        UserCommand::SearchInput(query) => {
            let due = Instant::now() + state.debounce();
            state.pending_query = Some((query, due));
        }
        UserCommand::AddPlayer(player) => {
            let name = player.name.clone();
            match state.editor.add(player) {
                Ok(AddOutcome::Appended { position }) => {
                    debug!(%name, position, "Player added");
                }
                Ok(AddOutcome::AwaitingPlacement) => {
                    send_notice(ui_tx, Notice::info(format!("Your top 10 is full: pick a slot for {name}"))).await;
                }
                Err(RankingError::DuplicatePlayer(_)) => {
                    send_notice(ui_tx, Notice::warning(format!("{name} is already in your top 10"))).await;
                }
                Err(e) => send_notice(ui_tx, Notice::warning(e.to_string())).await,
            }
            send_snapshot(state, ui_tx).await;
        }
        UserCommand::AssignSlot(position) => match state.editor.assign(position) {
            Ok(placement) => {
                if let Some(displaced) = placement.displaced {
                    debug!(%displaced, position = placement.position, "Slot overwritten");
                }
                send_snapshot(state, ui_tx).await;
            }
            Err(e) => send_notice(ui_tx, Notice::warning(e.to_string())).await,
        },
        UserCommand::CancelPlacement => {
            if state.editor.cancel().is_some() {
                send_snapshot(state, ui_tx).await;
            }
        }
        UserCommand::RemovePlayer(id) => {
            if state.editor.remove(&id) {
                send_snapshot(state, ui_tx).await;
            }
        }
        UserCommand::Reorder { from, to } => match state.editor.reorder(from, to) {
            Ok(()) => send_snapshot(state, ui_tx).await,
            Err(e) => debug!(error = %e, "Ignoring reorder"),
        },
        UserCommand::Save => {
            let in_flight = state
                .user_id()
                .is_some_and(|user_id| state.saves_in_flight.contains(&user_id));
            let request = if in_flight {
                Err(RankingError::SaveInProgress)
            } else {
                state.editor.begin_save()
            };
            let request = match request {
                Ok(request) => request,
                Err(e) => {
                    send_notice(ui_tx, Notice::warning(e.to_string())).await;
                    return;
                }
            };
            state.saves_in_flight.insert(request.user_id.clone());
            let editor_generation = state.editor_generation;
            let _ = ui_tx.send(UiUpdate::SaveStarted).await;
            send_snapshot(state, ui_tx).await;
            let store = Arc::clone(&state.backend.store);
            let tx = task_tx.clone();
            tokio::spawn(async move {
                let result = execute_save(store.as_ref(), &request).await;
                let _ = tx
                    .send(TaskEvent::Saved {
                        user_id: request.user_id,
                        editor_generation,
                        revision: request.revision,
                        result,
                    })
                    .await;
            });
        }
        UserCommand::RefreshCollective => {
            let _ = ui_tx.send(UiUpdate::CollectiveLoading).await;
            state.spawn_collective(task_tx);
        }
        UserCommand::SignIn { email } => match Session::from_email(&email) {
            Ok(session) => {
                if let Some(store) = &state.sessions {
                    if let Err(e) = store.save(&session) {
                        warn!(error = %e, "Could not remember session");
                    }
                }
                info!(email = %session.email, "Signed in");
                let message = format!("Signed in as {}", session.email);
                state.replace_editor(Some(session));
                send_snapshot(state, ui_tx).await;
                send_notice(ui_tx, Notice::info(message)).await;
                state.spawn_hydrate(task_tx);
            }
            Err(e) => send_notice(ui_tx, Notice::warning(e.to_string())).await,
        },
        UserCommand::SignOut => {
            if let Some(store) = &state.sessions {
                if let Err(e) = store.clear() {
                    warn!(error = %e, "Could not clear stored session");
                }
            }
            info!("Signed out");
            state.replace_editor(None);
            send_snapshot(state, ui_tx).await;
            send_notice(ui_tx, Notice::info("Signed out")).await;
        }
        UserCommand::Quit => {
            // Handled in the main loop
        }
    }
}

/// Handle a result reported by a spawned task.
async fn handle_task_event(
    state: &mut AppState,
    event: TaskEvent,
    ui_tx: &mpsc::Sender<UiUpdate>,
    task_tx: &mpsc::Sender<TaskEvent>,
) {
    match event {
        TaskEvent::Search { seq, query, result } => {
            if !state.search_seq.is_current(seq) {
                debug!(seq, latest = state.search_seq.latest(), "Discarding stale search result");
                return;
            }
            let update = match result {
                Ok(players) => UiUpdate::SearchResults { query, players },
                Err(e) => {
                    warn!(error = %e, "Catalog search failed");
                    UiUpdate::SearchFailed {
                        query,
                        message: e.to_string(),
                    }
                }
            };
            let _ = ui_tx.send(update).await;
        }
        TaskEvent::Saved {
            user_id,
            editor_generation,
            revision,
            result,
        } => {
            state.saves_in_flight.remove(&user_id);
            if editor_generation != state.editor_generation {
                info!(user = %user_id, "Save finished for a session that has ended");
                if result.is_ok() {
                    let _ = ui_tx.send(UiUpdate::CollectiveLoading).await;
                    state.spawn_collective(task_tx);
                }
                return;
            }
            match state.editor.finish_save(revision, result) {
                Ok(outcome) => {
                    info!(?outcome, "Rankings saved");
                    let _ = ui_tx
                        .send(UiUpdate::SaveFinished {
                            outcome,
                            at: chrono::Local::now(),
                        })
                        .await;
                    if outcome == SaveOutcome::KeptLocalEdits {
                        send_notice(ui_tx, Notice::info("Saved. Newer edits are not saved yet")).await;
                    }
                    let _ = ui_tx.send(UiUpdate::CollectiveLoading).await;
                    state.spawn_collective(task_tx);
                }
                Err(e @ RankingError::PartialSave(_)) => {
                    warn!(error = %e, "Partial save");
                    send_notice(ui_tx, Notice::error(format!("{e}. Press s to save again"))).await;
                }
                Err(e) => {
                    warn!(error = %e, "Save failed");
                    send_notice(ui_tx, Notice::error(format!("Save failed: {e}"))).await;
                }
            }
            send_snapshot(state, ui_tx).await;
        }
        TaskEvent::Collective { generation, result } => {
            if generation != state.collective_generation {
                debug!(generation, "Discarding stale consensus result");
                return;
            }
            let update = match result {
                Ok(rows) => UiUpdate::CollectiveRankings(rows),
                Err(e) => {
                    warn!(error = %e, "Consensus unavailable");
                    UiUpdate::CollectiveFailed(e.to_string())
                }
            };
            let _ = ui_tx.send(update).await;
        }
        TaskEvent::Hydrated {
            editor_generation,
            revision,
            result,
        } => {
            if editor_generation != state.editor_generation {
                debug!(editor_generation, "Discarding saved rankings loaded for an earlier session");
                return;
            }
            match result {
                Ok((slots, players)) => {
                    if state.editor.revision() == revision {
                        state.editor.hydrate(&slots);
                        info!(players = state.editor.len(), "Loaded saved rankings");
                    } else {
                        info!("List edited before saved rankings arrived, keeping local edits");
                    }
                    state.editor.remember(players);
                    send_snapshot(state, ui_tx).await;
                }
                Err(e) => {
                    warn!(error = %e, "Could not load saved rankings");
                    send_notice(ui_tx, Notice::error(format!("Could not load your saved ranking: {e}"))).await;
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use barbershop_core::aggregate::aggregate;
    use barbershop_core::catalog::matches_query;
    use barbershop_core::error::{CatalogError, StoreError};
    use barbershop_core::protocol::NoticeLevel;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::sync::Notify;

    // -----------------------------------------------------------------------
    // Fakes
    // -----------------------------------------------------------------------

    /// In-memory catalog + store + aggregator. `fail_insert` makes every
    /// insert fail after the delete has already gone through. With `gate`
    /// set, the first insert waits until the gate is notified.
    #[derive(Default)]
    struct FakeBackend {
        players: Vec<Player>,
        rows: Mutex<Vec<RankingSlot>>,
        fail_insert: bool,
        searches: Mutex<Vec<String>>,
        gate: Option<Arc<Notify>>,
        inserts: AtomicUsize,
    }

    #[async_trait]
    impl Catalog for FakeBackend {
        async fn search(&self, query: &str, limit: usize) -> Result<Vec<Player>, CatalogError> {
            self.searches.lock().unwrap().push(query.to_string());
            Ok(self
                .players
                .iter()
                .filter(|p| matches_query(p, query))
                .take(limit)
                .cloned()
                .collect())
        }

        async fn lookup(&self, ids: &[PlayerId]) -> Result<Vec<Player>, CatalogError> {
            Ok(self.players.iter().filter(|p| ids.contains(&p.id)).cloned().collect())
        }
    }

    #[async_trait]
    impl RankingStore for FakeBackend {
        async fn read_all(&self, user_id: &UserId) -> Result<Vec<RankingSlot>, StoreError> {
            Ok(self
                .rows
                .lock()
                .unwrap()
                .iter()
                .filter(|r| &r.user_id == user_id)
                .cloned()
                .collect())
        }

        async fn delete_all(&self, user_id: &UserId) -> Result<(), StoreError> {
            self.rows.lock().unwrap().retain(|r| &r.user_id != user_id);
            Ok(())
        }

        async fn insert_many(&self, slots: &[RankingSlot]) -> Result<(), StoreError> {
            let nth = self.inserts.fetch_add(1, Ordering::SeqCst);
            if let (0, Some(gate)) = (nth, &self.gate) {
                gate.notified().await;
            }
            if self.fail_insert {
                return Err(StoreError::Other("insert timed out".into()));
            }
            self.rows.lock().unwrap().extend_from_slice(slots);
            Ok(())
        }
    }

    #[async_trait]
    impl Aggregator for FakeBackend {
        async fn collective_rankings(&self, limit: usize) -> Result<Vec<CollectiveRankingRow>, StoreError> {
            let mut rows = aggregate(&self.rows.lock().unwrap(), limit);
            for row in &mut rows {
                row.player = self.players.iter().find(|p| p.id == row.player_id).cloned();
            }
            Ok(rows)
        }

        async fn all_slots(&self) -> Result<Vec<RankingSlot>, StoreError> {
            Ok(self.rows.lock().unwrap().clone())
        }
    }

    fn player(id: &str, name: &str) -> Player {
        Player {
            id: PlayerId::new(id),
            name: name.into(),
            team: Some("LAL".into()),
            position: Some("F".into()),
            image_url: None,
        }
    }

    fn roster() -> Vec<Player> {
        vec![
            player("1", "LeBron James"),
            player("2", "Anthony Davis"),
            player("3", "Austin Reaves"),
            player("4", "Luka Doncic"),
        ]
    }

    fn fake(fail_insert: bool) -> Arc<FakeBackend> {
        Arc::new(FakeBackend {
            players: roster(),
            fail_insert,
            ..Default::default()
        })
    }

    fn test_state(backend: Arc<FakeBackend>, email: Option<&str>) -> AppState {
        let session = email.map(|e| Session::from_email(e).unwrap());
        AppState::new(
            Backend::shared(backend),
            EditorPolicy::default(),
            SearchConfig::default(),
            session,
            None,
        )
    }

    /// Receive updates until one matches `pred`, returning it.
    async fn wait_for<F>(ui_rx: &mut mpsc::Receiver<UiUpdate>, pred: F) -> UiUpdate
    where
        F: Fn(&UiUpdate) -> bool,
    {
        loop {
            let update = tokio::time::timeout(Duration::from_secs(5), ui_rx.recv())
                .await
                .expect("timed out waiting for update")
                .expect("ui channel closed");
            if pred(&update) {
                return update;
            }
        }
    }

    fn is_notice(update: &UiUpdate) -> bool {
        matches!(update, UiUpdate::Notice(_))
    }

    fn entry_count(update: &UiUpdate) -> Option<usize> {
        match update {
            UiUpdate::Editor(snap) => Some(snap.entries.len()),
            _ => None,
        }
    }

    // -----------------------------------------------------------------------
    // Tests: event loop
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn event_loop_handles_quit_command() {
        let state = test_state(fake(false), None);
        let (cmd_tx, cmd_rx) = mpsc::channel(16);
        let (ui_tx, _ui_rx) = mpsc::channel(64);

        let handle = tokio::spawn(run(cmd_rx, ui_tx, state));
        cmd_tx.send(UserCommand::Quit).await.unwrap();

        let result = handle.await.unwrap();
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn duplicate_add_produces_notice_and_no_change() {
        let state = test_state(fake(false), None);
        let (cmd_tx, cmd_rx) = mpsc::channel(16);
        let (ui_tx, mut ui_rx) = mpsc::channel(64);
        let handle = tokio::spawn(run(cmd_rx, ui_tx, state));

        let lebron = player("1", "LeBron James");
        cmd_tx.send(UserCommand::AddPlayer(lebron.clone())).await.unwrap();
        wait_for(&mut ui_rx, |u| entry_count(u) == Some(1)).await;

        cmd_tx.send(UserCommand::AddPlayer(lebron)).await.unwrap();
        match wait_for(&mut ui_rx, is_notice).await {
            UiUpdate::Notice(n) => {
                assert_eq!(n.level, NoticeLevel::Warning);
                assert_eq!(n.message, "LeBron James is already in your top 10");
            }
            other => panic!("unexpected {other:?}"),
        }
        let after = wait_for(&mut ui_rx, |u| entry_count(u).is_some()).await;
        assert_eq!(entry_count(&after), Some(1));

        cmd_tx.send(UserCommand::Quit).await.unwrap();
        let _ = handle.await;
    }

    #[tokio::test]
    async fn save_while_signed_out_is_rejected() {
        let backend = fake(false);
        let state = test_state(Arc::clone(&backend), None);
        let (cmd_tx, cmd_rx) = mpsc::channel(16);
        let (ui_tx, mut ui_rx) = mpsc::channel(64);
        let handle = tokio::spawn(run(cmd_rx, ui_tx, state));

        cmd_tx.send(UserCommand::Save).await.unwrap();
        match wait_for(&mut ui_rx, is_notice).await {
            UiUpdate::Notice(n) => assert!(n.message.contains("sign in"), "{}", n.message),
            other => panic!("unexpected {other:?}"),
        }
        assert!(backend.rows.lock().unwrap().is_empty());

        cmd_tx.send(UserCommand::Quit).await.unwrap();
        let _ = handle.await;
    }

    #[tokio::test]
    async fn save_persists_and_refreshes_consensus() {
        let backend = fake(false);
        let state = test_state(Arc::clone(&backend), Some("fan@example.com"));
        let (cmd_tx, cmd_rx) = mpsc::channel(16);
        let (ui_tx, mut ui_rx) = mpsc::channel(64);
        let handle = tokio::spawn(run(cmd_rx, ui_tx, state));

        for p in roster().into_iter().take(3) {
            cmd_tx.send(UserCommand::AddPlayer(p)).await.unwrap();
        }
        wait_for(&mut ui_rx, |u| entry_count(u) == Some(3)).await;
        cmd_tx.send(UserCommand::Save).await.unwrap();

        match wait_for(&mut ui_rx, |u| matches!(u, UiUpdate::SaveFinished { .. })).await {
            UiUpdate::SaveFinished { outcome, .. } => assert_eq!(outcome, SaveOutcome::Synced),
            other => panic!("unexpected {other:?}"),
        }
        let rows = backend.rows.lock().unwrap().clone();
        let positions: Vec<u8> = rows.iter().map(|r| r.position).collect();
        assert_eq!(positions, [1, 2, 3]);

        match wait_for(&mut ui_rx, |u| {
            matches!(u, UiUpdate::CollectiveRankings(rows) if !rows.is_empty())
        })
        .await
        {
            UiUpdate::CollectiveRankings(rows) => {
                assert_eq!(rows.len(), 3);
                assert_eq!(rows[0].display_name(), "LeBron James");
            }
            other => panic!("unexpected {other:?}"),
        }

        cmd_tx.send(UserCommand::Quit).await.unwrap();
        let _ = handle.await;
    }

    #[tokio::test]
    async fn failed_insert_reports_partial_save_and_keeps_list() {
        let backend = fake(true);
        backend.rows.lock().unwrap().push(RankingSlot::new(
            UserId::new("user:fan@example.com"),
            1,
            PlayerId::new("4"),
        ));
        let state = test_state(Arc::clone(&backend), Some("fan@example.com"));
        let (cmd_tx, cmd_rx) = mpsc::channel(16);
        let (ui_tx, mut ui_rx) = mpsc::channel(64);
        let handle = tokio::spawn(run(cmd_rx, ui_tx, state));

        // Wait for the stored ranking to load before editing.
        wait_for(&mut ui_rx, |u| entry_count(u) == Some(1)).await;
        cmd_tx.send(UserCommand::AddPlayer(player("1", "LeBron James"))).await.unwrap();
        wait_for(&mut ui_rx, |u| entry_count(u) == Some(2)).await;
        cmd_tx.send(UserCommand::Save).await.unwrap();

        match wait_for(&mut ui_rx, is_notice).await {
            UiUpdate::Notice(n) => {
                assert_eq!(n.level, NoticeLevel::Error);
                assert!(n.message.contains("cleared"), "{}", n.message);
            }
            other => panic!("unexpected {other:?}"),
        }
        match wait_for(&mut ui_rx, |u| entry_count(u).is_some()).await {
            UiUpdate::Editor(snap) => {
                assert_eq!(snap.entries.len(), 2);
                assert!(!snap.saving);
                assert!(snap.dirty);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(backend.rows.lock().unwrap().is_empty());

        cmd_tx.send(UserCommand::Quit).await.unwrap();
        let _ = handle.await;
    }

    #[tokio::test(start_paused = true)]
    async fn typing_is_debounced_into_one_search() {
        let backend = fake(false);
        let state = test_state(Arc::clone(&backend), None);
        let (cmd_tx, cmd_rx) = mpsc::channel(16);
        let (ui_tx, mut ui_rx) = mpsc::channel(64);
        let handle = tokio::spawn(run(cmd_rx, ui_tx, state));

        // Initial empty-query page.
        wait_for(&mut ui_rx, |u| matches!(u, UiUpdate::SearchResults { .. })).await;

        for q in ["l", "lu", "luk"] {
            cmd_tx.send(UserCommand::SearchInput(q.into())).await.unwrap();
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        match wait_for(&mut ui_rx, |u| matches!(u, UiUpdate::SearchResults { .. })).await {
            UiUpdate::SearchResults { query, players } => {
                assert_eq!(query, "luk");
                assert_eq!(players.len(), 1);
                assert_eq!(players[0].name, "Luka Doncic");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(*backend.searches.lock().unwrap(), ["", "luk"]);

        cmd_tx.send(UserCommand::Quit).await.unwrap();
        let _ = handle.await;
    }

    #[tokio::test]
    async fn sign_in_hydrates_saved_ranking_with_details() {
        let backend = fake(false);
        backend.rows.lock().unwrap().extend([
            RankingSlot::new(UserId::new("user:fan@example.com"), 2, PlayerId::new("1")),
            RankingSlot::new(UserId::new("user:fan@example.com"), 1, PlayerId::new("3")),
        ]);
        let state = test_state(Arc::clone(&backend), None);
        let (cmd_tx, cmd_rx) = mpsc::channel(16);
        let (ui_tx, mut ui_rx) = mpsc::channel(64);
        let handle = tokio::spawn(run(cmd_rx, ui_tx, state));

        cmd_tx
            .send(UserCommand::SignIn {
                email: "Fan@Example.com".into(),
            })
            .await
            .unwrap();

        match wait_for(&mut ui_rx, |u| entry_count(u) == Some(2)).await {
            UiUpdate::Editor(snap) => {
                assert_eq!(snap.signed_in_as.as_deref(), Some("fan@example.com"));
                let names: Vec<_> = snap
                    .entries
                    .iter()
                    .map(|e| e.player.as_ref().map(|p| p.name.as_str()))
                    .collect();
                assert_eq!(names, [Some("Austin Reaves"), Some("LeBron James")]);
                assert!(!snap.dirty);
            }
            other => panic!("unexpected {other:?}"),
        }

        cmd_tx.send(UserCommand::SignOut).await.unwrap();
        match wait_for(&mut ui_rx, |u| entry_count(u).is_some()).await {
            UiUpdate::Editor(snap) => {
                assert!(snap.entries.is_empty());
                assert!(snap.signed_in_as.is_none());
            }
            other => panic!("unexpected {other:?}"),
        }

        cmd_tx.send(UserCommand::Quit).await.unwrap();
        let _ = handle.await;
    }

    fn stored_ids(backend: &FakeBackend) -> Vec<String> {
        let mut rows = backend.rows.lock().unwrap().clone();
        rows.sort_by_key(|r| r.position);
        rows.into_iter()
            .filter_map(|r| r.player_id.map(|id| id.0))
            .collect()
    }

    #[tokio::test]
    async fn save_from_ended_session_blocks_resave_and_is_not_applied() {
        let gate = Arc::new(Notify::new());
        let backend = Arc::new(FakeBackend {
            players: roster(),
            gate: Some(Arc::clone(&gate)),
            ..Default::default()
        });
        let state = test_state(Arc::clone(&backend), None);
        let (cmd_tx, cmd_rx) = mpsc::channel(16);
        let (ui_tx, mut ui_rx) = mpsc::channel(64);
        let handle = tokio::spawn(run(cmd_rx, ui_tx, state));
        let sign_in = || UserCommand::SignIn {
            email: "fan@example.com".into(),
        };
        let signed_in = |u: &UiUpdate| matches!(u, UiUpdate::Notice(n) if n.message.starts_with("Signed in"));

        // First session saves [1, 2]; the insert is held at the gate.
        cmd_tx.send(sign_in()).await.unwrap();
        wait_for(&mut ui_rx, signed_in).await;
        for p in roster().into_iter().take(2) {
            cmd_tx.send(UserCommand::AddPlayer(p)).await.unwrap();
        }
        wait_for(&mut ui_rx, |u| entry_count(u) == Some(2)).await;
        cmd_tx.send(UserCommand::Save).await.unwrap();
        wait_for(&mut ui_rx, |u| matches!(u, UiUpdate::SaveStarted)).await;
        tokio::time::timeout(Duration::from_secs(5), async {
            while backend.inserts.load(Ordering::SeqCst) == 0 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("first insert never started");

        // Same user comes back and edits [3, 4].
        cmd_tx.send(UserCommand::SignOut).await.unwrap();
        cmd_tx.send(sign_in()).await.unwrap();
        wait_for(&mut ui_rx, signed_in).await;
        for p in roster().into_iter().skip(2) {
            cmd_tx.send(UserCommand::AddPlayer(p)).await.unwrap();
        }
        wait_for(&mut ui_rx, |u| entry_count(u) == Some(2)).await;

        cmd_tx.send(UserCommand::Save).await.unwrap();
        match wait_for(&mut ui_rx, is_notice).await {
            UiUpdate::Notice(n) => {
                assert_eq!(n.level, NoticeLevel::Warning);
                assert_eq!(n.message, "a save is already in progress");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(backend.inserts.load(Ordering::SeqCst), 1);

        gate.notify_one();
        wait_for(&mut ui_rx, |u| {
            matches!(u, UiUpdate::CollectiveRankings(rows) if !rows.is_empty())
        })
        .await;
        assert_eq!(stored_ids(&backend), ["1", "2"]);

        // The new list is untouched by the old result and still unsaved.
        cmd_tx.send(UserCommand::Reorder { from: 0, to: 1 }).await.unwrap();
        let reordered = |u: &UiUpdate| {
            matches!(u, UiUpdate::Editor(snap) if snap.entries.first().is_some_and(|e| e.player_id.as_str() == "4"))
        };
        match wait_for(&mut ui_rx, reordered).await {
            UiUpdate::Editor(snap) => {
                let ids: Vec<_> = snap.entries.iter().map(|e| e.player_id.as_str()).collect();
                assert_eq!(ids, ["4", "3"]);
                assert!(snap.dirty);
                assert!(!snap.saving);
            }
            other => panic!("unexpected {other:?}"),
        }

        cmd_tx.send(UserCommand::Save).await.unwrap();
        match wait_for(&mut ui_rx, |u| matches!(u, UiUpdate::SaveFinished { .. })).await {
            UiUpdate::SaveFinished { outcome, .. } => assert_eq!(outcome, SaveOutcome::Synced),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(stored_ids(&backend), ["4", "3"]);

        cmd_tx.send(UserCommand::Quit).await.unwrap();
        let _ = handle.await;
    }
}
