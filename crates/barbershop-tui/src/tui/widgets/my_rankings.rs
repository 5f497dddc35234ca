// Your Top 10 widget: the personal ordered list with a selection cursor.
//
// Always draws ten numbered slots; unfilled slots show a dash.

use barbershop_core::editor::RankedEntry;
use barbershop_core::model::MAX_SLOTS;
use ratatui::layout::{Constraint, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Cell, Row, Table, TableState};
use ratatui::Frame;

use crate::tui::{Focus, ViewState};

pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let entries = &state.editor.entries;

    let rows: Vec<Row> = (0..MAX_SLOTS)
        .map(|i| match entries.get(i) {
            Some(entry) => Row::new(vec![
                Cell::from(format!("{:>2}", i + 1)),
                Cell::from(entry_name(entry).to_string()),
                Cell::from(entry.player.as_ref().map(|p| p.subtitle()).unwrap_or_default()),
            ]),
            None => Row::new(vec![
                Cell::from(format!("{:>2}", i + 1)),
                Cell::from("-"),
                Cell::from(""),
            ])
            .style(Style::default().fg(Color::DarkGray)),
        })
        .collect();

    let widths = [
        Constraint::Length(3),
        Constraint::Min(16),
        Constraint::Length(14),
    ];

    let focused = state.focus == Focus::Rankings;
    let border_style = if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };

    let table = Table::new(rows, widths)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border_style)
                .title(title(state)),
        )
        .row_highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    let mut table_state = TableState::default();
    if focused && !entries.is_empty() {
        table_state.select(Some(state.rank_cursor));
    }
    frame.render_stateful_widget(table, area, &mut table_state);
}

/// Name from the catalog record, or the raw id while details are loading.
fn entry_name(entry: &RankedEntry) -> &str {
    entry
        .player
        .as_ref()
        .map(|p| p.name.as_str())
        .unwrap_or(entry.player_id.as_str())
}

pub fn title(state: &ViewState) -> String {
    let mut title = format!(" Your Top 10 ({}/{}) ", state.editor.entries.len(), MAX_SLOTS);
    if state.editor.dirty {
        title.push_str("* ");
    }
    if state.editor.signed_in_as.is_none() {
        title.push_str("[press i to sign in] ");
    }
    title
}
