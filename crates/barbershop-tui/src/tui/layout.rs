// Screen layout: panel arrangement and sizing.
//
// +--------------------------------------------------+
// | Status Bar (1 row)                                |
// +--------------------------------------------------+
// | Notice (1 row)                                    |
// +-------------------------+------------------------+
// | Your Top 10 (12 rows)    | Collective Top 10      |
// +-------------------------+                        |
// | Search (fill)            |                        |
// +-------------------------+------------------------+
// | Help Bar (1 row)                                  |
// +--------------------------------------------------+

use ratatui::layout::{Constraint, Direction, Layout, Rect};

/// Height of the personal list panel: ten rows plus borders.
const MY_RANKINGS_HEIGHT: u16 = 12;

/// Resolved screen areas for each dashboard zone.
#[derive(Debug, Clone)]
pub struct AppLayout {
    /// Top row: session, save state, last saved time.
    pub status_bar: Rect,
    /// Second row: the latest notice from the app.
    pub notice: Rect,
    /// Left column top: the user's ordered list.
    pub my_rankings: Rect,
    /// Left column bottom: search input and results.
    pub search: Rect,
    /// Right column: the community consensus.
    pub collective: Rect,
    /// Bottom row: keyboard shortcut hints.
    pub help_bar: Rect,
}

/// Build the dashboard layout from the available terminal area.
pub fn build_layout(area: Rect) -> AppLayout {
    // Vertical: status(1) | notice(1) | middle(fill) | help(1)
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(8),
            Constraint::Length(1),
        ])
        .split(area);

    let status_bar = vertical[0];
    let notice = vertical[1];
    let middle = vertical[2];
    let help_bar = vertical[3];

    // Horizontal: editor column (55%) | consensus (45%)
    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(middle);

    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(MY_RANKINGS_HEIGHT),
            Constraint::Min(5),
        ])
        .split(horizontal[0]);

    AppLayout {
        status_bar,
        notice,
        my_rankings: left[0],
        search: left[1],
        collective: horizontal[1],
        help_bar,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
