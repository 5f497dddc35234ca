// Placement dialog: choose which slot the pending candidate overwrites.

use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use ratatui::Frame;

use super::centered_rect;
use crate::tui::ViewState;

const DIALOG_WIDTH: u16 = 48;
/// Ten slots plus borders, a header line, and a footer line.
const DIALOG_HEIGHT: u16 = 14;

pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let Some(candidate) = &state.editor.candidate else {
        return;
    };
    let dialog_area = centered_rect(DIALOG_WIDTH, DIALOG_HEIGHT, area);
    frame.render_widget(Clear, dialog_area);

    let key_style = Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD);
    let mut lines = vec![Line::from(vec![
        Span::raw("Replace which slot with "),
        Span::styled(candidate.name.clone(), Style::default().add_modifier(Modifier::BOLD)),
        Span::raw("?"),
    ])];
    for entry in &state.editor.entries {
        let name = entry
            .player
            .as_ref()
            .map(|p| p.name.clone())
            .unwrap_or_else(|| entry.player_id.to_string());
        lines.push(Line::from(vec![
            Span::styled(format!(" [{}] ", slot_key(entry.position)), key_style),
            Span::raw(format!("{:>2}. {name}", entry.position)),
        ]));
    }
    lines.push(Line::from(Span::styled(
        "Esc keeps the current list",
        Style::default().fg(Color::DarkGray),
    )));

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(Span::styled(" Your top 10 is full ", key_style));

    frame.render_widget(
        Paragraph::new(lines)
            .block(block)
            .style(Style::default().bg(Color::Black)),
        dialog_area,
    );
}

/// Key that selects a 1-based slot: `1`-`9`, then `0` for slot 10.
pub fn slot_key(position: usize) -> char {
    match position {
        10 => '0',
        p => char::from_digit(p as u32, 10).unwrap_or('?'),
    }
}
