//! Application-wide constants.
//!
//! Timing intervals, subprocess flags, file names, and UI messages used
//! throughout tunpilot.

#![allow(dead_code)]
use std::time::Duration;

// === Application Metadata ===

/// Application name and title (from Cargo.toml).
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
/// Current application version (from Cargo.toml).
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// === Timing Configuration ===

/// UI refresh rate in milliseconds; also drives the stats poll.
pub const DEFAULT_TICK_RATE: u64 = 1000;
/// Upper bound on a single elevated `pkill` invocation.
pub const KILL_COMMAND_TIMEOUT: Duration = Duration::from_secs(10);
/// Grace period between SIGTERM and the survivor re-check.
pub const TERM_GRACE_PERIOD: Duration = Duration::from_secs(2);
/// How long to wait for our own process group to exit before SIGKILL.
pub const GROUP_EXIT_TIMEOUT: Duration = Duration::from_secs(5);
/// How long the UI stays in Disconnecting before it forces Idle.
pub const DISCONNECT_DEADLINE: Duration = Duration::from_secs(15);
/// Poll interval while waiting on a child to exit.
pub const CHILD_POLL_INTERVAL: Duration = Duration::from_millis(100);

// === Subprocess Configuration ===

/// Default client binary, overridable via settings.toml.
pub const DEFAULT_CLIENT_BINARY: &str = "openvpn";
/// OpenVPN log verbosity passed as `--verb`.
pub const CLIENT_VERBOSITY: &str = "3";
/// Value passed as `--script-security` so up/down hooks may run.
pub const SCRIPT_SECURITY: &str = "2";
/// Default up/down hook script.
pub const DEFAULT_HOOK_SCRIPT: &str = "/etc/openvpn/update-resolv-conf";
/// Suffix for the ephemeral credentials file.
pub const AUTH_FILE_SUFFIX: &str = "_tunpilot_auth";

// === Path Configuration ===

/// Name of the profile store file inside the config directory.
pub const PROFILES_FILE_NAME: &str = "profiles.json";
/// Name of the settings file inside the config directory.
pub const SETTINGS_FILE_NAME: &str = "settings.toml";
/// Name of the logs subdirectory.
pub const LOGS_DIR_NAME: &str = "logs";
/// Name of the session log file inside the logs directory.
pub const SESSION_LOG_FILE_NAME: &str = "session.log";

// === UI Messages ===

/// Shown while no session is active.
pub const MSG_IDLE: &str = "Disconnected";
/// Shown while the handshake is in progress.
pub const MSG_CONNECTING: &str = "Connecting...";
/// Shown once the tunnel is up.
pub const MSG_CONNECTED: &str = "Connected";
/// Shown while teardown is running.
pub const MSG_DISCONNECTING: &str = "Disconnecting...";
/// Placeholder when interface counters are unavailable.
pub const MSG_NO_DATA: &str = "N/A";
/// Logged when the poll tick notices the client vanished.
pub const MSG_PROCESS_LOST: &str = "Client process not found. Connection lost.";
/// Logged when the client binary is missing at startup.
pub const MSG_CLIENT_MISSING: &str =
    "openvpn not found in PATH. Install it before connecting (e.g. apt install openvpn).";
