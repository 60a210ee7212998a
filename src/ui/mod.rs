//! UI rendering module

mod dashboard;
mod widgets;

use crate::app::App;
use ratatui::Frame;

/// Main render function
pub fn render(frame: &mut Frame, app: &mut App) {
    dashboard::render(frame, app);
}
