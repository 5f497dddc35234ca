// Status bar widget: session, save state, editor policy.

use barbershop_core::editor::{FullListPolicy, LengthPolicy, SaveOutcome};
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use crate::tui::ViewState;

/// Render the status bar into the given area.
///
/// Layout: [session] | [save state] | [policy]
pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let mut spans = vec![Span::styled(
        " The Barbershop ",
        Style::default()
            .fg(Color::Black)
            .bg(Color::White)
            .add_modifier(Modifier::BOLD),
    )];

    let (session, session_color) = match &state.editor.signed_in_as {
        Some(email) => (format!(" ● {email}"), Color::Green),
        None => (" ● signed out".to_string(), Color::Red),
    };
    spans.push(Span::styled(session, Style::default().fg(session_color)));

    spans.push(Span::styled(" | ", Style::default().fg(Color::Gray)));
    let (label, color) = save_label(state);
    spans.push(Span::styled(label, Style::default().fg(color)));

    spans.push(Span::styled(" | ", Style::default().fg(Color::Gray)));
    spans.push(Span::styled(
        policy_label(state.editor.policy.length, state.editor.policy.full_list),
        Style::default().fg(Color::DarkGray),
    ));

    let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));
    frame.render_widget(paragraph, area);
}

/// Describe where the personal list stands relative to the store.
pub fn save_label(state: &ViewState) -> (String, Color) {
    if state.saving {
        return ("Saving...".to_string(), Color::Yellow);
    }
    if state.editor.dirty {
        return ("Unsaved changes".to_string(), Color::Yellow);
    }
    match (state.last_saved, state.last_outcome) {
        (Some(at), Some(SaveOutcome::KeptLocalEdits)) => (
            format!("Saved {} (newer edits pending)", at.format("%H:%M:%S")),
            Color::Yellow,
        ),
        (Some(at), _) => (format!("Saved {}", at.format("%H:%M:%S")), Color::Green),
        (None, _) => ("Up to date".to_string(), Color::Gray),
    }
}

pub fn policy_label(length: LengthPolicy, full_list: FullListPolicy) -> &'static str {
    match (length, full_list) {
        (LengthPolicy::Permissive, FullListPolicy::ReplaceWithPlacement) => "any length, swap when full",
        (LengthPolicy::Permissive, FullListPolicy::AppendOnly) => "any length, append only",
        (LengthPolicy::Strict, FullListPolicy::ReplaceWithPlacement) => "exactly 10, swap when full",
        (LengthPolicy::Strict, FullListPolicy::AppendOnly) => "exactly 10, append only",
    }
}
