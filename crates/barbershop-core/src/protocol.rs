// Message types exchanged between the app event loop and the TUI.

use chrono::{DateTime, Local};

use crate::editor::{EditorSnapshot, SaveOutcome};
use crate::model::{CollectiveRankingRow, Player, PlayerId};

// ---------------------------------------------------------------------------
// TUI -> app
// ---------------------------------------------------------------------------

/// Commands sent from the TUI to the app orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub enum UserCommand {
    /// The search box changed. The app debounces before querying.
    SearchInput(String),
    AddPlayer(Player),
    /// Place the pending candidate at this 1-based position.
    AssignSlot(usize),
    CancelPlacement,
    RemovePlayer(PlayerId),
    /// Move the entry at `from` to `to` (0-based indices).
    Reorder { from: usize, to: usize },
    Save,
    RefreshCollective,
    SignIn { email: String },
    SignOut,
    Quit,
}

// ---------------------------------------------------------------------------
// App -> TUI
// ---------------------------------------------------------------------------

/// Updates sent from the app orchestrator to the TUI.
#[derive(Debug, Clone, PartialEq)]
pub enum UiUpdate {
    /// Full editor state; sent after every change to the personal list.
    Editor(Box<EditorSnapshot>),
    SearchLoading { query: String },
    SearchResults { query: String, players: Vec<Player> },
    SearchFailed { query: String, message: String },
    CollectiveLoading,
    CollectiveRankings(Vec<CollectiveRankingRow>),
    CollectiveFailed(String),
    SaveStarted,
    SaveFinished {
        outcome: SaveOutcome,
        at: DateTime<Local>,
    },
    Notice(Notice),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// A one-line message for the notice bar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Notice {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Notice {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Notice {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}
