//! Nord-derived color palette with semantic aliases.

#![allow(dead_code)]
use ratatui::style::Color;

// === Base palette ===

/// Dark background shade.
pub const POLAR_NIGHT: Color = Color::Rgb(46, 52, 64);
/// Muted border shade.
pub const POLAR_NIGHT_LIGHT: Color = Color::Rgb(67, 76, 94);
/// Primary light text.
pub const SNOW_STORM: Color = Color::Rgb(216, 222, 233);
/// Cyan accent.
pub const FROST: Color = Color::Rgb(136, 192, 208);
/// Red for errors and Failed state.
pub const AURORA_RED: Color = Color::Rgb(191, 97, 106);
/// Yellow for in-progress states.
pub const AURORA_YELLOW: Color = Color::Rgb(235, 203, 139);
/// Green for the Connected state.
pub const AURORA_GREEN: Color = Color::Rgb(163, 190, 140);

// === Semantic aliases ===

/// Main background color.
pub const BG_COLOR: Color = Color::Rgb(20, 20, 25);
/// Primary text color.
pub const TEXT_PRIMARY: Color = SNOW_STORM;
/// Secondary/muted text color.
pub const TEXT_SECONDARY: Color = Color::Rgb(76, 86, 106);
/// Accent color for highlights and the selected profile row.
pub const ACCENT: Color = FROST;
/// Connected state color.
pub const SUCCESS: Color = AURORA_GREEN;
/// Connecting/Disconnecting state color.
pub const WARNING: Color = AURORA_YELLOW;
/// Failed/Idle state color.
pub const ERROR: Color = AURORA_RED;
/// Default border color.
pub const BORDER_DEFAULT: Color = POLAR_NIGHT_LIGHT;
/// Selected row background color.
pub const ROW_SELECTED_BG: Color = Color::Rgb(40, 40, 40);
