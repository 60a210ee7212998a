//! Main dashboard view: status panel, profile list, and connection log.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use crate::app::App;
use crate::constants;
use crate::state::ConnectionState;
use crate::theme;
use crate::ui::widgets::footer;
use crate::utils;

pub fn render(frame: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(7), // Status
            Constraint::Min(0),    // Profiles + log
            Constraint::Length(1), // Footer
        ])
        .split(frame.area());

    render_status(frame, app, chunks[0]);
    render_body(frame, app, chunks[1]);
    footer::render(frame, app, chunks[2]);
}

fn state_label(app: &App) -> (String, ratatui::style::Color) {
    match &app.state {
        ConnectionState::Idle => (constants::MSG_IDLE.to_string(), theme::ERROR),
        ConnectionState::Connecting { .. } => {
            (constants::MSG_CONNECTING.to_string(), theme::WARNING)
        }
        ConnectionState::Connected { .. } => (constants::MSG_CONNECTED.to_string(), theme::SUCCESS),
        ConnectionState::Disconnecting { .. } => {
            (constants::MSG_DISCONNECTING.to_string(), theme::WARNING)
        }
        ConnectionState::Failed(reason) => (reason.to_string(), theme::ERROR),
    }
}

fn render_status(frame: &mut Frame, app: &App, area: Rect) {
    let (label, color) = state_label(app);

    let elapsed = app
        .connected_elapsed()
        .map_or_else(|| "00h 00m 00s".to_string(), utils::format_elapsed);

    let format_counter = |value: Option<u64>| {
        value.map_or_else(|| constants::MSG_NO_DATA.to_string(), utils::format_bytes)
    };
    let (sent, received) = app.counters;

    let interface = match &app.state {
        ConnectionState::Connected {
            interface: Some(iface),
            ..
        } => iface.clone(),
        _ => constants::MSG_NO_DATA.to_string(),
    };

    let lines = vec![
        Line::from(Span::styled(
            label,
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )),
        Line::from(vec![
            Span::styled("Interface: ", Style::default().fg(theme::TEXT_SECONDARY)),
            Span::styled(interface, Style::default().fg(theme::TEXT_PRIMARY)),
        ]),
        Line::from(vec![
            Span::styled("Connected Time: ", Style::default().fg(theme::TEXT_SECONDARY)),
            Span::styled(elapsed, Style::default().fg(theme::TEXT_PRIMARY)),
        ]),
        Line::from(vec![
            Span::styled("Data Sent: ", Style::default().fg(theme::TEXT_SECONDARY)),
            Span::styled(format_counter(sent), Style::default().fg(theme::TEXT_PRIMARY)),
            Span::raw("   "),
            Span::styled("Data Received: ", Style::default().fg(theme::TEXT_SECONDARY)),
            Span::styled(
                format_counter(received),
                Style::default().fg(theme::TEXT_PRIMARY),
            ),
        ]),
    ];

    let block = Block::default()
        .title(" Connection Status ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme::BORDER_DEFAULT));
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_body(frame: &mut Frame, app: &mut App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(32), Constraint::Percentage(68)])
        .split(area);

    render_profiles(frame, app, chunks[0]);
    render_log(frame, app, chunks[1]);
}

fn render_profiles(frame: &mut Frame, app: &App, area: Rect) {
    let items: Vec<ListItem> = if app.profiles.is_empty() {
        vec![ListItem::new(Line::from(Span::styled(
            "No profiles. Add one with 'tunpilot add'.",
            Style::default().fg(theme::TEXT_SECONDARY),
        )))]
    } else {
        app.profiles
            .iter()
            .map(|p| {
                let creds = if p.has_credentials() { "" } else { " (no auth)" };
                ListItem::new(Line::from(vec![
                    Span::styled(p.name.clone(), Style::default().fg(theme::TEXT_PRIMARY)),
                    Span::styled(creds, Style::default().fg(theme::TEXT_SECONDARY)),
                ]))
            })
            .collect()
    };

    let mut list_state = ListState::default();
    if !app.profiles.is_empty() {
        list_state.select(Some(app.selected));
    }

    let block = Block::default()
        .title(" Profiles ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme::BORDER_DEFAULT));
    let list = List::new(items).block(block).highlight_style(
        Style::default()
            .bg(theme::ROW_SELECTED_BG)
            .fg(theme::ACCENT)
            .add_modifier(Modifier::BOLD),
    );
    frame.render_stateful_widget(list, area, &mut list_state);
}

fn render_log(frame: &mut Frame, app: &App, area: Rect) {
    // Show the tail that fits inside the pane.
    let visible = area.height.saturating_sub(2) as usize;
    let start = app.log.len().saturating_sub(visible);
    let lines: Vec<Line> = app.log[start..]
        .iter()
        .map(|l| Line::from(Span::styled(l.clone(), Style::default().fg(theme::TEXT_PRIMARY))))
        .collect();

    let block = Block::default()
        .title(" Connection Log ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme::BORDER_DEFAULT));
    frame.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: false }),
        area,
    );
}
