//! Footer widget with context-aware keybinding hints

use crate::app::App;
use crate::state::ConnectionState;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

/// Render the footer with shortcuts matching the current state
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let mut hints: Vec<(&str, &str)> = Vec::new();

    match app.state {
        ConnectionState::Failed(_) => hints.push(("any key", "Dismiss")),
        ConnectionState::Connected { .. } => {
            hints.extend_from_slice(&[("Enter", "Disconnect"), ("d", "Disconnect")]);
        }
        ConnectionState::Connecting { .. } | ConnectionState::Disconnecting { .. } => {
            hints.push(("d", "Abort"));
        }
        ConnectionState::Idle => {
            if !app.profiles.is_empty() {
                hints.extend_from_slice(&[("↑↓", "Select"), ("Enter", "Connect")]);
            }
        }
    }
    hints.push(("c", "Clear log"));
    hints.push(("q", "Quit"));

    render_hints(frame, area, &hints);
}

fn render_hints(frame: &mut Frame, area: Rect, hints: &[(&str, &str)]) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Min(0),     // Hints (left)
            Constraint::Length(16), // Branding (right)
        ])
        .split(area);

    let mut hint_spans = Vec::new();
    let mut current_width = 0;
    let max_width = chunks[0].width as usize;

    hint_spans.push(Span::raw(" "));
    current_width += 1;

    for (i, (key, action)) in hints.iter().enumerate() {
        let sep_width = if i > 0 { 3 } else { 0 };
        let item_width = key.len() + 1 + action.len() + sep_width;
        if current_width + item_width > max_width {
            break;
        }

        if i > 0 {
            hint_spans.push(Span::styled(
                " │ ",
                Style::default().fg(Color::Rgb(50, 50, 50)),
            ));
        }
        hint_spans.push(Span::styled(
            *key,
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ));
        hint_spans.push(Span::raw(" "));
        hint_spans.push(Span::styled(*action, Style::default().fg(Color::DarkGray)));

        current_width += item_width;
    }
    frame.render_widget(Paragraph::new(Line::from(hint_spans)), chunks[0]);

    let branding = Line::from(vec![Span::styled(
        format!(
            "{} v{} ",
            crate::constants::APP_NAME,
            crate::constants::APP_VERSION
        ),
        Style::default().fg(crate::theme::TEXT_SECONDARY),
    )]);
    frame.render_widget(
        Paragraph::new(branding).alignment(Alignment::Right),
        chunks[1],
    );
}
