// Keyboard input handling and command dispatch.
//
// Translates crossterm key events into UserCommand messages sent to the
// app orchestrator, or into local ViewState mutations (focus, cursor
// movement, text entry).

use barbershop_core::protocol::UserCommand;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use super::{Focus, InputMode, ViewState};

/// Handle a keyboard event.
///
/// Returns `Some(UserCommand)` when the key press should be forwarded to the
/// app orchestrator. Returns `None` when the key press was handled locally.
pub fn handle_key(key_event: KeyEvent, view_state: &mut ViewState) -> Option<UserCommand> {
    // Crossterm on Windows reports releases too.
    if key_event.kind != KeyEventKind::Press {
        return None;
    }

    // Ctrl+C always quits immediately regardless of mode
    if key_event.modifiers.contains(KeyModifiers::CONTROL) && key_event.code == KeyCode::Char('c') {
        return Some(UserCommand::Quit);
    }

    match view_state.mode {
        InputMode::ConfirmQuit => return handle_confirm_quit(key_event, view_state),
        InputMode::SignIn => return handle_sign_in(key_event, view_state),
        InputMode::Search => return handle_search_input(key_event, view_state),
        InputMode::Normal => {}
    }

    // The placement dialog blocks everything else until a slot is chosen.
    if view_state.awaiting_placement() {
        return handle_placement(key_event);
    }

    match key_event.code {
        KeyCode::Tab | KeyCode::BackTab => {
            view_state.focus = match view_state.focus {
                Focus::Rankings => Focus::SearchResults,
                Focus::SearchResults => Focus::Rankings,
            };
            None
        }

        KeyCode::Up | KeyCode::Char('k') => {
            move_cursor(view_state, -1);
            None
        }
        KeyCode::Down | KeyCode::Char('j') => {
            move_cursor(view_state, 1);
            None
        }

        // Reorder: move the selected player down / up one slot.
        KeyCode::Char('J') => reorder_selected(view_state, 1),
        KeyCode::Char('K') => reorder_selected(view_state, -1),

        KeyCode::Char('d') | KeyCode::Delete => {
            if view_state.focus != Focus::Rankings {
                return None;
            }
            view_state
                .editor
                .entries
                .get(view_state.rank_cursor)
                .map(|entry| UserCommand::RemovePlayer(entry.player_id.clone()))
        }

        KeyCode::Enter | KeyCode::Char('a') => {
            if view_state.focus != Focus::SearchResults {
                return None;
            }
            view_state.selected_result().cloned().map(UserCommand::AddPlayer)
        }

        KeyCode::Char('/') => {
            view_state.mode = InputMode::Search;
            view_state.focus = Focus::SearchResults;
            None
        }

        KeyCode::Char('s') => Some(UserCommand::Save),
        KeyCode::Char('r') => Some(UserCommand::RefreshCollective),

        KeyCode::Char('i') => {
            view_state.email_input = view_state.editor.signed_in_as.clone().unwrap_or_default();
            view_state.mode = InputMode::SignIn;
            None
        }
        KeyCode::Char('o') => {
            if view_state.editor.signed_in_as.is_some() {
                Some(UserCommand::SignOut)
            } else {
                None
            }
        }

        KeyCode::Esc => {
            view_state.notice = None;
            None
        }

        // Quit: enter confirmation mode instead of quitting immediately
        KeyCode::Char('q') => {
            view_state.mode = InputMode::ConfirmQuit;
            None
        }

        _ => None,
    }
}

/// Keys while a candidate waits for a slot: `1`-`9` pick slots 1-9,
/// `0` picks slot 10, `Esc` drops the candidate. Everything else is blocked.
fn handle_placement(key_event: KeyEvent) -> Option<UserCommand> {
    match key_event.code {
        KeyCode::Char('0') => Some(UserCommand::AssignSlot(10)),
        KeyCode::Char(c @ '1'..='9') => c
            .to_digit(10)
            .map(|d| UserCommand::AssignSlot(d as usize)),
        KeyCode::Esc => Some(UserCommand::CancelPlacement),
        _ => None,
    }
}

/// `y`/`q` confirm, `n`/`Esc` cancel, all other keys are blocked.
fn handle_confirm_quit(key_event: KeyEvent, view_state: &mut ViewState) -> Option<UserCommand> {
    match key_event.code {
        KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Char('q') | KeyCode::Char('Q') => {
            Some(UserCommand::Quit)
        }
        KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
            view_state.mode = InputMode::Normal;
            None
        }
        _ => None,
    }
}

/// Each edit to the query is forwarded; the app debounces.
fn handle_search_input(key_event: KeyEvent, view_state: &mut ViewState) -> Option<UserCommand> {
    match key_event.code {
        KeyCode::Esc => {
            view_state.mode = InputMode::Normal;
            if view_state.search_query.is_empty() {
                return None;
            }
            view_state.search_query.clear();
            Some(UserCommand::SearchInput(String::new()))
        }
        KeyCode::Enter | KeyCode::Down => {
            view_state.mode = InputMode::Normal;
            None
        }
        KeyCode::Backspace => {
            view_state.search_query.pop()?;
            Some(UserCommand::SearchInput(view_state.search_query.clone()))
        }
        KeyCode::Char(c) => {
            view_state.search_query.push(c);
            Some(UserCommand::SearchInput(view_state.search_query.clone()))
        }
        _ => None,
    }
}

fn handle_sign_in(key_event: KeyEvent, view_state: &mut ViewState) -> Option<UserCommand> {
    match key_event.code {
        KeyCode::Esc => {
            view_state.mode = InputMode::Normal;
            None
        }
        KeyCode::Enter => {
            let email = view_state.email_input.trim().to_string();
            if email.is_empty() {
                return None;
            }
            view_state.mode = InputMode::Normal;
            Some(UserCommand::SignIn { email })
        }
        KeyCode::Backspace => {
            view_state.email_input.pop();
            None
        }
        KeyCode::Char(c) => {
            view_state.email_input.push(c);
            None
        }
        _ => None,
    }
}

fn move_cursor(view_state: &mut ViewState, delta: isize) {
    let (cursor, len) = match view_state.focus {
        Focus::Rankings => (&mut view_state.rank_cursor, view_state.editor.entries.len()),
        Focus::SearchResults => (&mut view_state.search_cursor, view_state.search_results.len()),
    };
    if len == 0 {
        *cursor = 0;
        return;
    }
    *cursor = cursor.saturating_add_signed(delta).min(len - 1);
}

/// Ask the app to swap the selected entry with its neighbour. The cursor
/// follows the moved player.
fn reorder_selected(view_state: &mut ViewState, delta: isize) -> Option<UserCommand> {
    if view_state.focus != Focus::Rankings {
        return None;
    }
    let from = view_state.rank_cursor;
    let to = from.checked_add_signed(delta)?;
    if to >= view_state.editor.entries.len() {
        return None;
    }
    view_state.rank_cursor = to;
    Some(UserCommand::Reorder { from, to })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
