//! Small shared helpers: config paths and display formatting.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::constants;

/// Per-user config directory for tunpilot, created on first use.
pub fn config_dir() -> std::io::Result<PathBuf> {
    let base = dirs::config_dir().unwrap_or_else(|| {
        PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into())).join(".config")
    });
    let dir = base.join(constants::APP_NAME);
    fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Logs directory under the config directory, created on first use.
pub fn logs_dir() -> std::io::Result<PathBuf> {
    let dir = config_dir()?.join(constants::LOGS_DIR_NAME);
    fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Format a cumulative byte count as a human-readable string.
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    #[allow(clippy::cast_precision_loss)]
    match bytes {
        b if b < KB => format!("{b} B"),
        b if b < MB => format!("{:.2} KB", b as f64 / KB as f64),
        b if b < GB => format!("{:.2} MB", b as f64 / MB as f64),
        b => format!("{:.2} GB", b as f64 / GB as f64),
    }
}

/// Format an elapsed duration as `HHh MMm SSs`.
pub fn format_elapsed(elapsed: Duration) -> String {
    let total = elapsed.as_secs();
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    format!("{hours:02}h {minutes:02}m {seconds:02}s")
}
