// Notice line: the most recent message from the app, coloured by level.

use barbershop_core::protocol::NoticeLevel;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Span;
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use crate::tui::ViewState;

pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let Some(notice) = &state.notice else {
        return;
    };
    let style = match notice.level {
        NoticeLevel::Info => Style::default().fg(Color::Cyan),
        NoticeLevel::Warning => Style::default().fg(Color::Yellow),
        NoticeLevel::Error => Style::default()
            .fg(Color::Red)
            .add_modifier(Modifier::BOLD),
    };
    frame.render_widget(
        Paragraph::new(Span::styled(format!(" {}", notice.message), style)),
        area,
    );
}
