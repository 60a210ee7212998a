//! Session teardown.
//!
//! Best-effort shutdown: every step runs even when an earlier one failed or
//! timed out, failures are logged to the output sink, and credentials cleanup
//! always happens last. The system-wide pkill fallback is inherently racy
//! against unrelated instances of the same binary; that imprecision is
//! accepted.

use std::io;
use std::process::{Child, Command, Stdio};
use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};

use tempfile::TempPath;

use crate::constants;
use crate::supervisor::launcher::{detect_elevation, Elevation};
use crate::supervisor::stats;

/// Terminate the active session's processes and remove its credentials file.
///
/// `child_slot` holds our own launched subprocess, if we still have it;
/// `creds_slot` holds the ephemeral credentials path. Both slots are emptied.
pub fn run(
    binary: &str,
    child_slot: &Mutex<Option<Child>>,
    creds_slot: &Mutex<Option<TempPath>>,
    log: &dyn Fn(&str),
) {
    log("Attempting to stop client processes...");

    // System-wide SIGTERM to every process named after the client binary.
    match signal_all(binary, "-TERM") {
        Ok(()) => log("Sent SIGTERM to client processes."),
        Err(e) => log(&format!("Error sending SIGTERM: {e}")),
    }

    thread::sleep(constants::TERM_GRACE_PERIOD);

    if stats::client_running(binary) {
        log("Client still running, forcing termination...");
        match signal_all(binary, "-KILL") {
            Ok(()) => log("Sent SIGKILL to client processes."),
            Err(e) => log(&format!("Error sending SIGKILL: {e}")),
        }
    } else {
        log("Client processes terminated successfully.");
    }

    // Independently, signal the process group of the child we launched.
    let own = child_slot.lock().ok().and_then(|mut slot| slot.take());
    if let Some(mut child) = own {
        stop_own_child(&mut child, log);
    } else {
        log("No local client process to stop.");
    }

    cleanup_credentials(creds_slot, log);
}

/// Escalating TERM→KILL teardown of the child's whole process group.
pub(crate) fn stop_own_child(child: &mut Child, log: &dyn Fn(&str)) {
    match child.try_wait() {
        Ok(Some(_)) => {
            log("Local client process already terminated.");
            return;
        }
        Ok(None) => {}
        Err(e) => {
            log(&format!("Error checking local client process: {e}"));
            return;
        }
    }

    log("Stopping local client process...");
    signal_group_term(child.id());

    if wait_with_deadline(child, constants::GROUP_EXIT_TIMEOUT).is_some() {
        log("Local client process terminated gracefully.");
        return;
    }

    log("Timeout waiting for local process, forcing SIGKILL...");
    signal_group_kill(child.id());
    match child.wait() {
        Ok(_) => log("Local client process forced to terminate."),
        Err(e) => log(&format!("Error waiting for local client process: {e}")),
    }
}

/// Remove the ephemeral credentials file, if one still exists. Safe to call
/// repeatedly; the slot is emptied on first use.
pub fn cleanup_credentials(creds_slot: &Mutex<Option<TempPath>>, log: &dyn Fn(&str)) {
    let creds = creds_slot.lock().ok().and_then(|mut slot| slot.take());
    if let Some(path) = creds {
        match path.close() {
            Ok(()) => log("Temporary authentication file removed."),
            Err(e) => log(&format!("Error removing temporary authentication file: {e}")),
        }
    }
}

/// Send a signal to all processes matching the binary name, elevating when we
/// are not root, bounded by [`constants::KILL_COMMAND_TIMEOUT`].
fn signal_all(binary: &str, signal_flag: &str) -> io::Result<()> {
    let mut argv: Vec<&str> = Vec::new();
    match detect_elevation() {
        Elevation::None => {}
        Elevation::Pkexec => argv.push("pkexec"),
        Elevation::Sudo => argv.push("sudo"),
    }
    // pkill matches the comm name, never a full path.
    argv.extend(["pkill", signal_flag, stats::process_name(binary)]);

    let mut child = Command::new(argv[0])
        .args(&argv[1..])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;

    if wait_with_deadline(&mut child, constants::KILL_COMMAND_TIMEOUT).is_none() {
        let _ = child.kill();
        let _ = child.wait();
        return Err(io::Error::new(
            io::ErrorKind::TimedOut,
            "timed out waiting for pkill",
        ));
    }
    Ok(())
}

/// Poll `try_wait` until the child exits or the deadline passes.
fn wait_with_deadline(child: &mut Child, timeout: Duration) -> Option<std::process::ExitStatus> {
    let deadline = Instant::now() + timeout;
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Some(status),
            Ok(None) if Instant::now() >= deadline => return None,
            Ok(None) => thread::sleep(constants::CHILD_POLL_INTERVAL),
            Err(_) => return None,
        }
    }
}

/// SIGTERM the entire process group led by `pid`.
fn signal_group_term(pid: u32) {
    #[cfg(unix)]
    signal_group(pid, libc::SIGTERM);
    #[cfg(not(unix))]
    let _ = pid;
}

/// SIGKILL the entire process group led by `pid`.
fn signal_group_kill(pid: u32) {
    #[cfg(unix)]
    signal_group(pid, libc::SIGKILL);
    #[cfg(not(unix))]
    let _ = pid;
}

#[cfg(unix)]
#[allow(unsafe_code)]
fn signal_group(pid: u32, signal: i32) {
    #[allow(clippy::cast_possible_wrap)]
    let pgid = -(pid as i32);
    // SAFETY: plain kill(2) on a negative pgid; no memory is touched.
    unsafe {
        libc::kill(pgid, signal);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_cleanup_credentials_is_idempotent() {
        let path = crate::supervisor::launcher::write_auth_file("u", "p").unwrap();
        let on_disk = PathBuf::from(&*path);
        assert!(on_disk.exists());

        let slot = Mutex::new(Some(path));
        let log = |_: &str| {};
        cleanup_credentials(&slot, &log);
        assert!(!on_disk.exists());

        // Second call finds an empty slot and does nothing.
        cleanup_credentials(&slot, &log);
        assert!(slot.lock().unwrap().is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_signal_all_matches_path_configured_binary() {
        use std::os::unix::fs::PermissionsExt;

        if !crate::supervisor::launcher::is_root() {
            return; // elevation prefix would block in a test run
        }

        // A uniquely-named script; its comm name is the file name, not the
        // full path it is configured and launched under.
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("tpshutdowntest");
        std::fs::write(&script, "#!/bin/sh\nsleep 30\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let mut child = Command::new(&script).spawn().unwrap();
        signal_all(&script.display().to_string(), "-TERM").unwrap();
        assert!(wait_with_deadline(&mut child, Duration::from_secs(3)).is_some());
    }

    #[test]
    fn test_wait_with_deadline_quick_exit() {
        let mut child = Command::new("true").spawn().unwrap();
        assert!(wait_with_deadline(&mut child, Duration::from_secs(2)).is_some());
    }

    #[test]
    fn test_wait_with_deadline_times_out() {
        let mut child = Command::new("sleep").arg("10").spawn().unwrap();
        assert!(wait_with_deadline(&mut child, Duration::from_millis(200)).is_none());
        let _ = child.kill();
        let _ = child.wait();
    }

    #[cfg(unix)]
    #[test]
    fn test_signal_group_terminates_leader() {
        use std::os::unix::process::CommandExt;

        let mut child = Command::new("sleep")
            .arg("10")
            .process_group(0)
            .spawn()
            .unwrap();
        signal_group(child.id(), libc::SIGTERM);
        let status = wait_with_deadline(&mut child, Duration::from_secs(2));
        assert!(status.is_some());
    }

    #[cfg(unix)]
    #[test]
    fn test_stop_own_child_escalates_and_reaps() {
        use std::os::unix::process::CommandExt;

        // A shell that ignores SIGTERM forces the SIGKILL path.
        let mut child = Command::new("sh")
            .args(["-c", "trap '' TERM; sleep 30"])
            .process_group(0)
            .spawn()
            .unwrap();

        let logged = Mutex::new(Vec::new());
        let log = |line: &str| logged.lock().unwrap().push(line.to_string());
        stop_own_child(&mut child, &log);

        // Process is gone either way; try_wait on a reaped child errors or
        // reports an exit, never reports it still running.
        assert!(!matches!(child.try_wait(), Ok(None)));
        assert!(logged
            .lock()
            .unwrap()
            .iter()
            .any(|l| l.contains("terminate")));
    }
}
