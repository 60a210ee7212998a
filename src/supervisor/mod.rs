//! Connection supervisor.
//!
//! Owns the lifecycle of one `openvpn` subprocess per connect attempt: launch,
//! log classification, teardown, and credentials cleanup. The worker thread is
//! the only blocking component; it reports back to the UI loop through a
//! one-way mpsc channel of [`SessionEvent`]s.

pub mod classifier;
pub mod launcher;
pub mod shutdown;
pub mod stats;

use std::io::{BufRead, BufReader};
use std::process::Child;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, Sender};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::Instant;

use tempfile::TempPath;

use crate::config::Settings;
use crate::constants;
use crate::state::{ConnectionProfile, FailureReason};
use self::classifier::{LogClassifier, Verdict};

/// One-way notifications from the session worker to the UI loop.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Human-readable status text changed.
    StatusChanged(String),
    /// One verbatim line of subprocess output.
    OutputLine(String),
    /// The tunnel is up; carries the detected interface name, if any.
    Established { interface: Option<String> },
    /// The attempt failed with a classified reason.
    Failed(FailureReason),
    /// The worker finished and all session resources are released.
    WorkerDone,
}

/// A live connect attempt. At most one exists at a time; dropping it does not
/// kill the subprocess — call [`ConnectionSession::request_stop`] for that.
pub struct ConnectionSession {
    /// Profile this session was started from.
    pub profile: ConnectionProfile,
    /// When the subprocess was launched.
    pub started: Instant,
    events: Receiver<SessionEvent>,
    events_tx: Sender<SessionEvent>,
    stop_requested: Arc<AtomicBool>,
    child_slot: Arc<Mutex<Option<Child>>>,
    creds_slot: Arc<Mutex<Option<TempPath>>>,
    binary: String,
}

impl ConnectionSession {
    /// Launch the subprocess on a background worker and return the session
    /// handle immediately.
    pub fn start(settings: &Settings, profile: ConnectionProfile) -> Self {
        let (tx, rx) = mpsc::channel();
        let stop_requested = Arc::new(AtomicBool::new(false));
        let child_slot = Arc::new(Mutex::new(None));
        let creds_slot = Arc::new(Mutex::new(None));

        let worker_tx = tx.clone();
        let worker_settings = settings.clone();
        let worker_profile = profile.clone();
        let worker_stop = Arc::clone(&stop_requested);
        let worker_child = Arc::clone(&child_slot);
        let worker_creds = Arc::clone(&creds_slot);
        thread::spawn(move || {
            run_worker(
                &worker_settings,
                &worker_profile,
                &worker_tx,
                &worker_stop,
                &worker_child,
                &worker_creds,
            );
            let _ = worker_tx.send(SessionEvent::WorkerDone);
        });

        Self {
            profile,
            started: Instant::now(),
            events: rx,
            events_tx: tx,
            stop_requested,
            child_slot,
            creds_slot,
            binary: settings.client_binary.clone(),
        }
    }

    /// Non-blocking event poll, drained by the UI tick.
    pub fn try_next_event(&self) -> Option<SessionEvent> {
        self.events.try_recv().ok()
    }

    pub fn stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::SeqCst)
    }

    /// Mark the session stopped and run the shutdown coordinator on a
    /// background thread. Repeated calls are no-ops after the first.
    pub fn request_stop(&self) {
        if self.stop_requested.swap(true, Ordering::SeqCst) {
            return;
        }

        let binary = self.binary.clone();
        let child_slot = Arc::clone(&self.child_slot);
        let creds_slot = Arc::clone(&self.creds_slot);
        let tx = self.events_tx.clone();
        thread::spawn(move || {
            shutdown::run(&binary, &child_slot, &creds_slot, &|line| {
                let _ = tx.send(SessionEvent::OutputLine(line.to_string()));
            });
        });
    }
}

/// Worker body: launch, classify the merged output stream, report the
/// outcome, clean up.
fn run_worker(
    settings: &Settings,
    profile: &ConnectionProfile,
    tx: &Sender<SessionEvent>,
    stop: &AtomicBool,
    child_slot: &Mutex<Option<Child>>,
    creds_slot: &Mutex<Option<TempPath>>,
) {
    // A stop that raced session startup wins; never spawn after it.
    if stop.load(Ordering::SeqCst) {
        return;
    }

    let _ = tx.send(SessionEvent::StatusChanged(
        constants::MSG_CONNECTING.to_string(),
    ));

    let (mut child, auth_path, argv) = match launcher::launch(settings, profile) {
        Ok(launched) => launched,
        Err(e) => {
            let reason = FailureReason::Launch(e.to_string());
            let _ = tx.send(SessionEvent::OutputLine(format!("Launch failed: {e}")));
            let _ = tx.send(SessionEvent::Failed(reason));
            return;
        }
    };

    let _ = tx.send(SessionEvent::OutputLine(format!(
        "Executing command: {}",
        argv.join(" ")
    )));

    if let Ok(mut slot) = creds_slot.lock() {
        *slot = auth_path;
    }

    // Merge stdout and stderr into one line stream via forwarder threads; the
    // channel disconnects when both pipes close.
    let (line_tx, line_rx) = mpsc::channel::<String>();
    if let Some(stdout) = child.stdout.take() {
        spawn_line_reader(stdout, line_tx.clone());
    }
    if let Some(stderr) = child.stderr.take() {
        spawn_line_reader(stderr, line_tx.clone());
    }
    drop(line_tx);

    if let Ok(mut slot) = child_slot.lock() {
        *slot = Some(child);
    }

    // The teardown thread may have emptied the slot before we filled it; a
    // stop observed now means we must reap the late spawn ourselves.
    if stop.load(Ordering::SeqCst) {
        if let Some(mut late) = child_slot.lock().ok().and_then(|mut slot| slot.take()) {
            shutdown::stop_own_child(&mut late, &|line| {
                let _ = tx.send(SessionEvent::OutputLine(line.to_string()));
            });
        }
    }

    let mut classifier = LogClassifier::new();
    for line in &line_rx {
        if stop.load(Ordering::SeqCst) {
            break;
        }
        if !line.trim().is_empty() {
            let _ = tx.send(SessionEvent::OutputLine(line.clone()));
        }
        match classifier.observe(&line) {
            Some(Verdict::Connected { interface }) => {
                let _ = tx.send(SessionEvent::StatusChanged(
                    constants::MSG_CONNECTED.to_string(),
                ));
                let _ = tx.send(SessionEvent::Established { interface });
            }
            Some(Verdict::Failed(reason)) => {
                let _ = tx.send(SessionEvent::StatusChanged(reason.to_string()));
                let _ = tx.send(SessionEvent::Failed(reason));
            }
            None => {}
        }
    }

    // Stream ended (or stop requested): reap the child if teardown has not
    // already taken it.
    let exit_code = child_slot
        .lock()
        .ok()
        .and_then(|mut slot| slot.take())
        .and_then(|mut child| child.wait().ok())
        .and_then(|status| status.code());

    if !classifier.is_latched() && !stop.load(Ordering::SeqCst) {
        let _ = tx.send(SessionEvent::Failed(FailureReason::Terminated(exit_code)));
    }

    shutdown::cleanup_credentials(creds_slot, &|line| {
        let _ = tx.send(SessionEvent::OutputLine(line.to_string()));
    });
}

/// Forward every line of `reader` into `tx` until EOF.
fn spawn_line_reader<R>(reader: R, tx: Sender<String>)
where
    R: std::io::Read + Send + 'static,
{
    thread::spawn(move || {
        let buffered = BufReader::new(reader);
        for line in buffered.lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;
    use std::time::Duration;

    /// Build a fake client script and a session settings/profile pair that
    /// runs it. Worker tests only run as root, where no elevation prefix is
    /// inserted ahead of the script.
    fn fake_client(script_body: &str) -> (tempfile::TempDir, Settings, ConnectionProfile) {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("fakevpn");
        std::fs::write(&script, format!("#!/bin/sh\n{script_body}\n")).unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        }

        let config = dir.path().join("client.ovpn");
        let mut f = std::fs::File::create(&config).unwrap();
        writeln!(f, "remote vpn.example.com 1194").unwrap();

        let settings = Settings {
            client_binary: script.display().to_string(),
            ..Settings::default()
        };
        let profile = ConnectionProfile {
            name: "fake".to_string(),
            config_path: config,
            username: Some("user".to_string()),
            password: Some("pass".to_string()),
        };
        (dir, settings, profile)
    }

    fn drain_until_done(session: &ConnectionSession, timeout: Duration) -> Vec<SessionEvent> {
        let deadline = Instant::now() + timeout;
        let mut events = Vec::new();
        while Instant::now() < deadline {
            if let Some(event) = session.try_next_event() {
                let done = matches!(event, SessionEvent::WorkerDone);
                events.push(event);
                if done {
                    return events;
                }
            } else {
                thread::sleep(Duration::from_millis(20));
            }
        }
        events
    }

    #[test]
    fn test_worker_reports_connected_with_interface() {
        if !launcher::is_root() {
            return; // elevation prefix would break the fake client
        }
        let (_dir, settings, profile) = fake_client(
            "echo 'TUN/TAP device tun0 opened'\n\
             echo 'Initialization Sequence Completed'",
        );
        let session = ConnectionSession::start(&settings, profile);
        let events = drain_until_done(&session, Duration::from_secs(10));

        assert!(events.iter().any(|e| matches!(
            e,
            SessionEvent::Established { interface: Some(i) } if i == "tun0"
        )));
        assert!(matches!(events.last(), Some(SessionEvent::WorkerDone)));
    }

    #[test]
    fn test_worker_reports_unexpected_termination_with_exit_code() {
        if !launcher::is_root() {
            return;
        }
        let (_dir, settings, profile) = fake_client("echo 'starting up'\nexit 3");
        let session = ConnectionSession::start(&settings, profile);
        let events = drain_until_done(&session, Duration::from_secs(10));

        assert!(events
            .iter()
            .any(|e| matches!(e, SessionEvent::Failed(FailureReason::Terminated(Some(3))))));
    }

    #[test]
    fn test_credentials_file_removed_after_session() {
        if !launcher::is_root() {
            return;
        }
        let (_dir, settings, profile) = fake_client("echo 'AUTH_FAILED'");
        let session = ConnectionSession::start(&settings, profile);
        let events = drain_until_done(&session, Duration::from_secs(10));

        assert!(events
            .iter()
            .any(|e| matches!(e, SessionEvent::Failed(FailureReason::AuthFailed))));
        assert!(session.creds_slot.lock().unwrap().is_none());
    }

    #[test]
    fn test_merged_stream_sees_stderr_lines() {
        if !launcher::is_root() {
            return;
        }
        let (_dir, settings, profile) = fake_client("echo 'on stderr' 1>&2\nexit 0");
        let session = ConnectionSession::start(&settings, profile);
        let events = drain_until_done(&session, Duration::from_secs(10));

        assert!(events
            .iter()
            .any(|e| matches!(e, SessionEvent::OutputLine(l) if l == "on stderr")));
    }

    #[test]
    fn test_worker_never_launches_after_stop() {
        let (_dir, settings, profile) = fake_client("touch \"$0.mark\"\nsleep 5");
        let (tx, rx) = mpsc::channel();
        let stop = AtomicBool::new(true);
        let child_slot = Mutex::new(None);
        let creds_slot = Mutex::new(None);

        run_worker(&settings, &profile, &tx, &stop, &child_slot, &creds_slot);

        assert!(rx.try_recv().is_err());
        assert!(child_slot.lock().unwrap().is_none());
        let marker = std::path::PathBuf::from(format!("{}.mark", settings.client_binary));
        assert!(!marker.exists());
    }

    #[test]
    fn test_request_stop_is_idempotent() {
        if !launcher::is_root() {
            return;
        }
        let (_dir, settings, profile) = fake_client("sleep 5");
        let session = ConnectionSession::start(&settings, profile);
        session.request_stop();
        session.request_stop();
        assert!(session.stop_requested());
        let events = drain_until_done(&session, Duration::from_secs(20));
        assert!(matches!(events.last(), Some(SessionEvent::WorkerDone)));
    }
}
