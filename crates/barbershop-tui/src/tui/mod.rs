// TUI dashboard: layout, input handling, and widget rendering.
//
// The TUI owns a `ViewState` that mirrors what the app orchestrator reports.
// The orchestrator pushes `UiUpdate` messages over an mpsc channel; the TUI
// applies them to `ViewState` and re-renders at ~30 fps.

pub mod input;
pub mod layout;
pub mod widgets;

use std::time::Duration;

use barbershop_core::editor::{EditorSnapshot, SaveOutcome};
use barbershop_core::model::{CollectiveRankingRow, Player};
use barbershop_core::protocol::{Notice, UiUpdate, UserCommand};
use chrono::{DateTime, Local};
use crossterm::event::{Event, EventStream};
use futures_util::StreamExt;
use ratatui::Frame;
use tokio::sync::mpsc;

use layout::build_layout;

// ---------------------------------------------------------------------------
// ViewState
// ---------------------------------------------------------------------------

/// Which list the arrow keys move through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Focus {
    #[default]
    Rankings,
    SearchResults,
}

/// Text entry and overlay modes that capture the keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMode {
    #[default]
    Normal,
    /// Typing into the search box.
    Search,
    /// Typing an email into the sign-in dialog.
    SignIn,
    ConfirmQuit,
}

/// Load state for a panel fed by the app.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PanelStatus {
    #[default]
    Idle,
    Loading,
    Failed(String),
}

/// TUI-local state that mirrors the application state for rendering.
#[derive(Debug, Default)]
pub struct ViewState {
    /// Latest editor snapshot: the personal list and pending candidate.
    pub editor: EditorSnapshot,
    /// Text currently in the search box.
    pub search_query: String,
    pub search_results: Vec<Player>,
    pub search_status: PanelStatus,
    pub collective: Vec<CollectiveRankingRow>,
    pub collective_status: PanelStatus,
    pub saving: bool,
    pub last_saved: Option<DateTime<Local>>,
    pub last_outcome: Option<SaveOutcome>,
    /// Most recent notice from the app.
    pub notice: Option<Notice>,
    pub focus: Focus,
    pub mode: InputMode,
    /// Selected row in "Your Top 10" (0-based).
    pub rank_cursor: usize,
    /// Selected row in the search results.
    pub search_cursor: usize,
    /// Email typed into the sign-in dialog.
    pub email_input: String,
}

impl ViewState {
    /// True while the app holds an 11th player waiting for a slot.
    pub fn awaiting_placement(&self) -> bool {
        self.editor.candidate.is_some()
    }

    pub fn selected_result(&self) -> Option<&Player> {
        self.search_results.get(self.search_cursor)
    }

    fn clamp_cursors(&mut self) {
        self.rank_cursor = self
            .rank_cursor
            .min(self.editor.entries.len().saturating_sub(1));
        self.search_cursor = self
            .search_cursor
            .min(self.search_results.len().saturating_sub(1));
    }
}

// ---------------------------------------------------------------------------
// UiUpdate processing
// ---------------------------------------------------------------------------

/// Apply a single UiUpdate to the ViewState.
pub fn apply_ui_update(state: &mut ViewState, update: UiUpdate) {
    match update {
        UiUpdate::Editor(snapshot) => {
            state.saving = snapshot.saving;
            state.editor = *snapshot;
        }
        UiUpdate::SearchLoading { .. } => {
            state.search_status = PanelStatus::Loading;
        }
        UiUpdate::SearchResults { players, .. } => {
            state.search_results = players;
            state.search_status = PanelStatus::Idle;
            state.search_cursor = 0;
        }
        UiUpdate::SearchFailed { message, .. } => {
            // The personal list is unaffected.
            state.search_results.clear();
            state.search_status = PanelStatus::Failed(message);
        }
        UiUpdate::CollectiveLoading => {
            state.collective_status = PanelStatus::Loading;
        }
        UiUpdate::CollectiveRankings(rows) => {
            state.collective = rows;
            state.collective_status = PanelStatus::Idle;
        }
        UiUpdate::CollectiveFailed(message) => {
            state.collective_status = PanelStatus::Failed(message);
        }
        UiUpdate::SaveStarted => {
            state.saving = true;
        }
        UiUpdate::SaveFinished { outcome, at } => {
            state.saving = false;
            state.last_saved = Some(at);
            state.last_outcome = Some(outcome);
        }
        UiUpdate::Notice(notice) => {
            state.notice = Some(notice);
        }
    }
    state.clamp_cursors();
}

// ---------------------------------------------------------------------------
// Render frame
// ---------------------------------------------------------------------------

/// Render the complete dashboard frame, then any overlay on top.
pub fn render_frame(frame: &mut Frame, state: &ViewState) {
    let layout = build_layout(frame.area());

    widgets::status_bar::render(frame, layout.status_bar, state);
    widgets::notice::render(frame, layout.notice, state);
    widgets::my_rankings::render(frame, layout.my_rankings, state);
    widgets::search::render(frame, layout.search, state);
    widgets::collective::render(frame, layout.collective, state);
    widgets::help_bar::render(frame, layout.help_bar, state);

    // Overlays, most urgent last so it ends up on top.
    if state.awaiting_placement() {
        widgets::placement::render(frame, frame.area(), state);
    }
    if state.mode == InputMode::SignIn {
        widgets::sign_in::render(frame, frame.area(), state);
    }
    if state.mode == InputMode::ConfirmQuit {
        widgets::quit_confirm::render(frame, frame.area());
    }
}

// ---------------------------------------------------------------------------
// Event loop
// ---------------------------------------------------------------------------

/// Run the TUI until the user quits or the app closes the update channel.
pub async fn run(
    mut ui_rx: mpsc::Receiver<UiUpdate>,
    cmd_tx: mpsc::Sender<UserCommand>,
) -> anyhow::Result<()> {
    // 1. Initialize terminal
    let mut terminal = ratatui::init();

    // 2. Restore the terminal before the default panic output.
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        ratatui::restore();
        original_hook(panic_info);
    }));

    // 3. Create ViewState
    let mut view_state = ViewState::default();

    // 4. Create crossterm EventStream for async keyboard input
    let mut event_stream = EventStream::new();

    // 5. Create render interval (~30fps)
    let mut render_tick = tokio::time::interval(Duration::from_millis(33));
    render_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    // 6. Main loop
    loop {
        tokio::select! {
            update = ui_rx.recv() => {
                match update {
                    Some(ui_update) => apply_ui_update(&mut view_state, ui_update),
                    // Channel closed: app is shutting down
                    None => break,
                }
            }

            maybe_event = event_stream.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key_event))) => {
                        if let Some(cmd) = input::handle_key(key_event, &mut view_state) {
                            let quit = cmd == UserCommand::Quit;
                            if cmd_tx.send(cmd).await.is_err() || quit {
                                break;
                            }
                        }
                    }
                    // Mouse and resize events: the next tick redraws.
                    Some(Ok(_)) => {}
                    Some(Err(_)) | None => break,
                }
            }

            _ = render_tick.tick() => {
                terminal.draw(|frame| render_frame(frame, &view_state))?;
            }
        }
    }

    // 7. Restore terminal
    ratatui::restore();

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
