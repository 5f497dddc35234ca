// Help bar widget: key hints for the current mode.

use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use crate::tui::{Focus, InputMode, ViewState};

pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let mut spans = Vec::new();
    for (key, action) in hints(state) {
        spans.push(Span::styled(
            format!(" {key}"),
            Style::default().fg(Color::Yellow),
        ));
        spans.push(Span::styled(
            format!(" {action} "),
            Style::default().fg(Color::Gray),
        ));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// (key, action) pairs shown for the current mode.
pub fn hints(state: &ViewState) -> Vec<(&'static str, &'static str)> {
    match state.mode {
        InputMode::ConfirmQuit => vec![("y", "quit"), ("n", "stay")],
        InputMode::SignIn => vec![("Enter", "sign in"), ("Esc", "cancel")],
        InputMode::Search => vec![("Enter", "results"), ("Esc", "clear")],
        InputMode::Normal if state.awaiting_placement() => {
            vec![("1-9", "slot"), ("0", "slot 10"), ("Esc", "cancel")]
        }
        InputMode::Normal => {
            let mut hints = vec![("/", "search"), ("Tab", "switch")];
            match state.focus {
                Focus::Rankings => {
                    hints.extend([("J/K", "move"), ("d", "remove")]);
                }
                Focus::SearchResults => hints.push(("Enter", "add")),
            }
            hints.extend([("s", "save"), ("r", "refresh")]);
            if state.editor.signed_in_as.is_some() {
                hints.push(("o", "sign out"));
            } else {
                hints.push(("i", "sign in"));
            }
            hints.push(("q", "quit"));
            hints
        }
    }
}
