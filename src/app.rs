//! Central application state and event handling.
//!
//! The UI loop owns an [`App`] and feeds it key events and ticks. All
//! blocking work lives in the session worker; the tick handlers only run
//! bounded OS queries (counter read, liveness check) and drain the session's
//! event channel.

use std::fs;
use std::io::Write as _;
use std::process::Command;
use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent};

use crate::config::Settings;
use crate::constants;
use crate::state::{ConnectionProfile, ConnectionState, ProfileStore};
use crate::supervisor::{stats, ConnectionSession, SessionEvent};
use crate::utils;

/// Maximum retained log lines before the oldest are dropped.
const LOG_CAP: usize = 500;

pub struct App {
    pub settings: Settings,
    store: ProfileStore,
    pub profiles: Vec<ConnectionProfile>,
    pub selected: usize,
    pub state: ConnectionState,
    session: Option<ConnectionSession>,
    /// Latest status text from the worker, shown in the header.
    pub status_text: String,
    /// Cumulative (sent, received) counters for the active interface.
    pub counters: (Option<u64>, Option<u64>),
    pub log: Vec<String>,
    pub should_quit: bool,
    /// Whether the client binary answered `--version` at startup.
    pub client_available: bool,
    session_log: Option<fs::File>,
}

impl App {
    pub fn new(settings: Settings) -> std::io::Result<Self> {
        let store = ProfileStore::open_default()?;
        Ok(Self::with_store(settings, store))
    }

    /// Build an app around an already-opened store. Used directly by tests.
    pub fn with_store(settings: Settings, store: ProfileStore) -> Self {
        let profiles = store.all();
        let client_available = client_available(&settings.client_binary);
        let session_log = utils::logs_dir()
            .and_then(|dir| {
                fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(dir.join(constants::SESSION_LOG_FILE_NAME))
            })
            .ok();

        let mut app = Self {
            settings,
            store,
            profiles,
            selected: 0,
            state: ConnectionState::Idle,
            session: None,
            status_text: constants::MSG_IDLE.to_string(),
            counters: (None, None),
            log: Vec::new(),
            should_quit: false,
            client_available,
            session_log,
        };
        if !app.client_available {
            app.add_log(constants::MSG_CLIENT_MISSING);
        }
        app
    }

    // === Input ===

    pub fn on_key(&mut self, key: KeyEvent) {
        // Any key acknowledges a failure and returns to Idle; the quit keys
        // additionally quit in the same press.
        if matches!(self.state, ConnectionState::Failed(_)) {
            self.acknowledge_failure();
            if matches!(key.code, KeyCode::Char('q') | KeyCode::Esc) {
                self.should_quit = true;
            }
            return;
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => {
                if self.state.is_active() {
                    self.disconnect();
                }
                self.should_quit = true;
            }
            KeyCode::Up | KeyCode::Char('k') => {
                if self.selected > 0 {
                    self.selected -= 1;
                }
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.selected + 1 < self.profiles.len() {
                    self.selected += 1;
                }
            }
            KeyCode::Enter => {
                if self.state.is_connected() {
                    self.disconnect();
                } else {
                    self.connect_selected();
                }
            }
            KeyCode::Char('d') => self.disconnect(),
            KeyCode::Char('c') => self.log.clear(),
            _ => {}
        }
    }

    // === Tick ===

    pub fn on_tick(&mut self) {
        self.drain_session_events();

        // Process-lost detection: the poll tick notices the client vanished
        // even though no stop was issued, and forces the normal teardown.
        if self.state.is_connected()
            && self.session.is_some()
            && !stats::client_running(&self.settings.client_binary)
        {
            self.add_log(constants::MSG_PROCESS_LOST);
            self.disconnect();
            return;
        }

        // Counter refresh; unavailable is (None, None), never zero.
        self.counters = match &self.state {
            ConnectionState::Connected {
                interface: Some(iface),
                ..
            } => stats::interface_counters(iface),
            _ => (None, None),
        };

        // Never leave the UI stuck in Disconnecting.
        if let ConnectionState::Disconnecting { since } = self.state {
            if since.elapsed() > constants::DISCONNECT_DEADLINE {
                self.add_log("Waiting for shutdown timed out. Forcing idle state.");
                self.finish_session();
            }
        }
    }

    fn drain_session_events(&mut self) {
        let mut events = Vec::new();
        if let Some(session) = &self.session {
            while let Some(event) = session.try_next_event() {
                events.push(event);
            }
        }
        for event in events {
            self.handle_session_event(event);
        }
    }

    fn handle_session_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::StatusChanged(text) => self.status_text = text,
            SessionEvent::OutputLine(line) => self.add_log(&line),
            SessionEvent::Established { interface } => {
                // A stop racing the handshake wins; stay in Disconnecting.
                if matches!(self.state, ConnectionState::Disconnecting { .. }) {
                    return;
                }
                if let Some(iface) = &interface {
                    self.add_log(&format!("VPN interface detected: {iface}"));
                } else {
                    self.add_log(
                        "Warning: could not determine VPN interface; throughput will be unavailable.",
                    );
                }
                self.add_log("VPN connection successfully established.");
                self.state = ConnectionState::Connected {
                    since: Instant::now(),
                    interface,
                };
            }
            SessionEvent::Failed(reason) => {
                // Ignore classifications arriving after a stop was requested.
                if matches!(self.state, ConnectionState::Disconnecting { .. }) {
                    return;
                }
                self.add_log(&format!("CONNECTION FAILED: {reason}"));
                self.add_log(&format!("Hint: {}", reason.hint()));
                self.state = ConnectionState::Failed(reason);
            }
            SessionEvent::WorkerDone => {
                self.add_log("Session worker finished.");
                match &self.state {
                    ConnectionState::Failed(_) => {
                        // Keep the failure on screen; just release the session.
                        self.session = None;
                        self.counters = (None, None);
                    }
                    ConnectionState::Connected { .. } => {
                        self.add_log("Connection lost: client exited.");
                        self.finish_session();
                    }
                    _ => self.finish_session(),
                }
            }
        }
    }

    // === Actions ===

    pub fn connect_selected(&mut self) {
        if self.state.is_active() {
            return;
        }
        if !self.client_available {
            self.add_log(constants::MSG_CLIENT_MISSING);
            return;
        }
        let Some(profile) = self.profiles.get(self.selected).cloned() else {
            self.add_log("No profile selected.");
            return;
        };

        let content = match fs::read_to_string(&profile.config_path) {
            Ok(content) if !content.trim().is_empty() => content,
            Ok(_) => {
                self.add_log(&format!(
                    "Configuration file is empty: {}",
                    profile.config_path.display()
                ));
                return;
            }
            Err(e) => {
                self.add_log(&format!(
                    "Could not read configuration file {}: {e}",
                    profile.config_path.display()
                ));
                return;
            }
        };
        if content.to_lowercase().contains("auth-user-pass") && !profile.has_credentials() {
            self.add_log("Warning: config requires credentials but none are stored; the connection may fail.");
        }

        self.add_log(&"=".repeat(35));
        self.add_log(&format!("Initiating VPN connection: {}", profile.name));
        self.add_log(&format!("File: {}", profile.config_path.display()));
        self.add_log(&"=".repeat(35));

        self.counters = (None, None);
        self.state = ConnectionState::Connecting {
            since: Instant::now(),
        };
        self.session = Some(ConnectionSession::start(&self.settings, profile));
    }

    /// Request teardown of the active session. Safe to call at any time,
    /// including twice in a row or with no session at all.
    pub fn disconnect(&mut self) {
        if self.session.is_some() {
            self.add_log("Requesting VPN disconnection...");
            if let Some(session) = &self.session {
                session.request_stop();
            }
            if !matches!(self.state, ConnectionState::Disconnecting { .. }) {
                self.state = ConnectionState::Disconnecting {
                    since: Instant::now(),
                };
            }
        } else if self.state.is_active() {
            self.finish_session();
        } else if !matches!(self.state, ConnectionState::Failed(_)) {
            self.state = ConnectionState::Idle;
        }
    }

    fn acknowledge_failure(&mut self) {
        if let Some(session) = &self.session {
            session.request_stop();
        }
        self.finish_session();
    }

    /// Release session resources and return to Idle.
    fn finish_session(&mut self) {
        self.session = None;
        self.counters = (None, None);
        self.state = ConnectionState::Idle;
        self.status_text = constants::MSG_IDLE.to_string();
    }

    // === Display helpers ===

    /// Elapsed time of the established tunnel, if connected.
    pub fn connected_elapsed(&self) -> Option<Duration> {
        match &self.state {
            ConnectionState::Connected { since, .. } => Some(since.elapsed()),
            _ => None,
        }
    }

    pub fn add_log(&mut self, line: &str) {
        if let Some(file) = &mut self.session_log {
            let _ = writeln!(file, "{line}");
        }
        self.log.push(line.to_string());
        if self.log.len() > LOG_CAP {
            let excess = self.log.len() - LOG_CAP;
            self.log.drain(..excess);
        }
    }
}

/// Probe the client binary the way a user would notice it missing.
fn client_available(binary: &str) -> bool {
    Command::new(binary)
        .arg("--version")
        .output()
        .is_ok_and(|o| o.status.success())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::FailureReason;
    use std::path::PathBuf;

    fn app() -> App {
        let dir = tempfile::tempdir().unwrap();
        let store = ProfileStore::open(dir.path().join("profiles.json"));
        App::with_store(Settings::default(), store)
    }

    #[test]
    fn test_disconnect_with_no_session_is_idle_and_idempotent() {
        let mut app = app();
        app.disconnect();
        assert_eq!(app.state, ConnectionState::Idle);
        app.disconnect();
        assert_eq!(app.state, ConnectionState::Idle);
    }

    #[cfg(unix)]
    #[test]
    fn test_disconnect_with_live_session_enters_disconnecting() {
        if !crate::supervisor::launcher::is_root() {
            return; // elevation prefix would break the fake client
        }
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("fakevpn");
        fs::write(&script, "#!/bin/sh\nsleep 5\n").unwrap();
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
        }
        let config = dir.path().join("client.ovpn");
        fs::write(&config, "remote vpn.example.com 1194\n").unwrap();

        let mut app = app();
        app.settings.client_binary = script.display().to_string();
        app.state = ConnectionState::Connecting {
            since: Instant::now(),
        };
        let profile = ConnectionProfile {
            name: "fake".to_string(),
            config_path: config,
            username: None,
            password: None,
        };
        app.session = Some(ConnectionSession::start(&app.settings, profile));

        app.disconnect();
        assert!(matches!(app.state, ConnectionState::Disconnecting { .. }));
        assert!(app
            .log
            .iter()
            .any(|l| l.contains("Requesting VPN disconnection")));

        // Repeated calls keep the original deadline.
        app.disconnect();
        assert!(matches!(app.state, ConnectionState::Disconnecting { .. }));
    }

    #[test]
    fn test_failure_acknowledged_returns_to_idle() {
        let mut app = app();
        app.state = ConnectionState::Failed(FailureReason::AuthFailed);
        app.on_key(KeyEvent::from(KeyCode::Enter));
        assert_eq!(app.state, ConnectionState::Idle);
    }

    #[test]
    fn test_quit_key_acknowledges_failure_and_quits() {
        let mut app = app();
        app.state = ConnectionState::Failed(FailureReason::AuthFailed);
        app.on_key(KeyEvent::from(KeyCode::Char('q')));
        assert_eq!(app.state, ConnectionState::Idle);
        assert!(app.should_quit);
    }

    #[test]
    fn test_connect_rejected_while_active() {
        let mut app = app();
        app.state = ConnectionState::Connecting {
            since: Instant::now(),
        };
        app.connect_selected();
        // Still connecting; no session was created for the second attempt.
        assert!(matches!(app.state, ConnectionState::Connecting { .. }));
        assert!(app.session.is_none());
    }

    #[test]
    fn test_connect_with_missing_config_fails_cleanly() {
        let mut app = app();
        app.client_available = true;
        app.profiles.push(ConnectionProfile {
            name: "ghost".to_string(),
            config_path: PathBuf::from("/nonexistent/ghost.ovpn"),
            username: None,
            password: None,
        });
        app.connect_selected();
        assert_eq!(app.state, ConnectionState::Idle);
        assert!(app
            .log
            .iter()
            .any(|l| l.contains("Could not read configuration file")));
    }

    #[test]
    fn test_failed_event_sets_state_and_hint() {
        let mut app = app();
        app.state = ConnectionState::Connecting {
            since: Instant::now(),
        };
        app.handle_session_event(SessionEvent::Failed(FailureReason::DnsError));
        assert_eq!(
            app.state,
            ConnectionState::Failed(FailureReason::DnsError)
        );
        assert!(app.log.iter().any(|l| l.starts_with("Hint:")));
    }

    #[test]
    fn test_failed_event_ignored_while_disconnecting() {
        let mut app = app();
        app.state = ConnectionState::Disconnecting {
            since: Instant::now(),
        };
        app.handle_session_event(SessionEvent::Failed(FailureReason::NetworkError));
        assert!(matches!(app.state, ConnectionState::Disconnecting { .. }));
    }

    #[test]
    fn test_established_event_connects_with_interface() {
        let mut app = app();
        app.state = ConnectionState::Connecting {
            since: Instant::now(),
        };
        app.handle_session_event(SessionEvent::Established {
            interface: Some("tun0".to_string()),
        });
        assert!(matches!(
            &app.state,
            ConnectionState::Connected { interface: Some(i), .. } if i == "tun0"
        ));
    }

    #[test]
    fn test_worker_done_after_failure_keeps_failure_visible() {
        let mut app = app();
        app.state = ConnectionState::Failed(FailureReason::TlsError);
        app.handle_session_event(SessionEvent::WorkerDone);
        assert_eq!(app.state, ConnectionState::Failed(FailureReason::TlsError));
    }

    #[test]
    fn test_log_capped() {
        let mut app = app();
        for i in 0..(LOG_CAP + 50) {
            app.add_log(&format!("line {i}"));
        }
        assert_eq!(app.log.len(), LOG_CAP);
        assert!(app.log[0].contains("line"));
    }
}
