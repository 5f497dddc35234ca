// Collective Top 10 widget: the community consensus.
//
// Columns: Rank, Name, Team • Pos, Avg, Votes

use barbershop_core::model::CollectiveRankingRow;
use ratatui::layout::{Constraint, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Span;
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table};
use ratatui::Frame;

use crate::tui::{PanelStatus, ViewState};

pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let title = match state.collective_status {
        PanelStatus::Loading => " Collective Top 10 (refreshing) ",
        _ => " Collective Top 10 ",
    };
    let block = Block::default().borders(Borders::ALL).title(title);

    if let Some((message, style)) = placeholder(state) {
        frame.render_widget(Paragraph::new(Span::styled(message, style)).block(block), area);
        return;
    }

    let header = Row::new(vec![
        Cell::from("#"),
        Cell::from("Player"),
        Cell::from("Team • Pos"),
        Cell::from("Avg"),
        Cell::from("Votes"),
    ])
    .style(Style::default().fg(Color::White).add_modifier(Modifier::BOLD));

    let rows: Vec<Row> = state.collective.iter().map(row).collect();

    let widths = [
        Constraint::Length(3),
        Constraint::Min(14),
        Constraint::Length(12),
        Constraint::Length(6),
        Constraint::Length(5),
    ];

    frame.render_widget(Table::new(rows, widths).header(header).block(block), area);
}

fn row(r: &CollectiveRankingRow) -> Row<'static> {
    let style = if r.collective_rank == 1 {
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    };
    Row::new(vec![
        Cell::from(r.collective_rank.to_string()),
        Cell::from(r.display_name().to_string()),
        Cell::from(r.player.as_ref().map(|p| p.subtitle()).unwrap_or_default()),
        Cell::from(format_avg(r.avg_rank)),
        Cell::from(r.vote_count.to_string()),
    ])
    .style(style)
}

/// Average rank rounded to two decimals.
pub fn format_avg(avg: f64) -> String {
    format!("{avg:.2}")
}

/// Message shown instead of the table when there is nothing to list.
fn placeholder(state: &ViewState) -> Option<(String, Style)> {
    match &state.collective_status {
        PanelStatus::Failed(message) => Some((
            format!("Could not load rankings: {message}"),
            Style::default().fg(Color::Red),
        )),
        PanelStatus::Loading if state.collective.is_empty() => {
            Some(("Loading...".into(), Style::default().fg(Color::DarkGray)))
        }
        _ if state.collective.is_empty() => Some((
            "No votes yet. Save your top 10 to start the list.".into(),
            Style::default().fg(Color::DarkGray),
        )),
        _ => None,
    }
}
