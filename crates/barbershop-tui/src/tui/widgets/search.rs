// Search widget: query input line and catalog results.
//
// Players already in the personal list carry an "Added" marker. Loading,
// empty, and error states replace the results list inline.

use barbershop_core::model::Player;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};
use ratatui::Frame;

use crate::tui::{Focus, InputMode, PanelStatus, ViewState};

pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let focused = state.focus == Focus::SearchResults;
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(if focused {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default()
        })
        .title(format!(" Search ({}) ", state.search_results.len()));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let [input_area, results_area] =
        Layout::vertical([Constraint::Length(1), Constraint::Min(0)]).areas(inner);

    frame.render_widget(Paragraph::new(input_line(state)), input_area);

    if let Some(message) = status_message(state) {
        let style = match state.search_status {
            PanelStatus::Failed(_) => Style::default().fg(Color::Red),
            _ => Style::default().fg(Color::DarkGray),
        };
        frame.render_widget(Paragraph::new(Span::styled(message, style)), results_area);
        return;
    }

    let items: Vec<ListItem> = state
        .search_results
        .iter()
        .map(|p| result_item(p, is_added(state, p)))
        .collect();

    let list = List::new(items)
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    let mut list_state = ListState::default();
    if focused {
        list_state.select(Some(state.search_cursor));
    }
    frame.render_stateful_widget(list, results_area, &mut list_state);
}

fn input_line(state: &ViewState) -> Line<'static> {
    let editing = state.mode == InputMode::Search;
    let mut spans = vec![Span::styled("/ ", Style::default().fg(Color::Yellow))];
    if state.search_query.is_empty() && !editing {
        spans.push(Span::styled(
            "name, team or position",
            Style::default().fg(Color::DarkGray),
        ));
    } else {
        spans.push(Span::raw(state.search_query.clone()));
    }
    if editing {
        spans.push(Span::styled("_", Style::default().add_modifier(Modifier::SLOW_BLINK)));
    }
    Line::from(spans)
}

/// Text shown instead of the results list, if any.
pub fn status_message(state: &ViewState) -> Option<String> {
    match &state.search_status {
        PanelStatus::Failed(message) => Some(format!("Search unavailable: {message}")),
        PanelStatus::Loading if state.search_results.is_empty() => Some("Searching...".into()),
        _ if state.search_results.is_empty() => Some("No players found".into()),
        _ => None,
    }
}

fn is_added(state: &ViewState, player: &Player) -> bool {
    state
        .editor
        .entries
        .iter()
        .any(|e| e.player_id == player.id)
}

fn result_item(player: &Player, added: bool) -> ListItem<'static> {
    let mut spans = vec![
        Span::raw(player.name.clone()),
        Span::styled(
            format!("  {}", player.subtitle()),
            Style::default().fg(Color::Gray),
        ),
    ];
    if added {
        spans.push(Span::styled(
            "  Added",
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        ));
    }
    ListItem::new(Line::from(spans))
}
