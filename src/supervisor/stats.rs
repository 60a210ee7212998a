//! Interface counter polling and process liveness checks.
//!
//! Counters are cumulative byte totals since interface creation, read fresh
//! from the OS on every call. Two output formats are tolerated: the modern
//! `ip -s link show` layout and the legacy `ifconfig` layout.

use std::path::Path;
use std::process::Command;

use regex::Regex;

/// Cumulative (sent, received) byte totals for `interface`.
///
/// Returns `(None, None)` when neither query strategy yields a parseable
/// result; callers must render that as unavailable, never as zero.
pub fn interface_counters(interface: &str) -> (Option<u64>, Option<u64>) {
    if let Some(output) = run_capture("ip", &["-s", "link", "show", interface]) {
        let parsed = parse_ip_stats(&output);
        if parsed != (None, None) {
            return parsed;
        }
    }

    if let Some(output) = run_capture("ifconfig", &[interface]) {
        let parsed = parse_ifconfig_stats(&output);
        if parsed != (None, None) {
            return parsed;
        }
    }

    (None, None)
}

/// Whether any process with the client binary's name is running (`pgrep -x`).
pub fn client_running(binary: &str) -> bool {
    Command::new("pgrep")
        .args(["-x", process_name(binary)])
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// The comm name `pgrep`/`pkill` match against. The configured binary may be
/// a bare name or a full path; only the final component matches.
pub fn process_name(binary: &str) -> &str {
    Path::new(binary)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(binary)
}

fn run_capture(program: &str, args: &[&str]) -> Option<String> {
    let output = Command::new(program).args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    Some(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Parse `ip -s link show` output. Byte totals sit on the line following the
/// `RX:`/`TX:` header rows.
fn parse_ip_stats(output: &str) -> (Option<u64>, Option<u64>) {
    let rx_re = Regex::new(r"RX:\s+bytes\s+packets.*\n\s*(\d+)").unwrap();
    let tx_re = Regex::new(r"TX:\s+bytes\s+packets.*\n\s*(\d+)").unwrap();

    let received = rx_re
        .captures(output)
        .and_then(|c| c[1].parse::<u64>().ok());
    let sent = tx_re
        .captures(output)
        .and_then(|c| c[1].parse::<u64>().ok());

    match (sent, received) {
        (Some(s), Some(r)) => (Some(s), Some(r)),
        _ => (None, None),
    }
}

/// Parse `ifconfig` output in either the `RX bytes:N` or the
/// `RX packets N  bytes N` layout.
fn parse_ifconfig_stats(output: &str) -> (Option<u64>, Option<u64>) {
    let rx_re = Regex::new(r"RX bytes:(\d+)|RX packets \d+\s+bytes (\d+)").unwrap();
    let tx_re = Regex::new(r"TX bytes:(\d+)|TX packets \d+\s+bytes (\d+)").unwrap();

    fn pick(caps: regex::Captures) -> Option<u64> {
        caps.get(1)
            .or_else(|| caps.get(2))
            .and_then(|m| m.as_str().parse::<u64>().ok())
    }

    let received = rx_re.captures(output).and_then(pick);
    let sent = tx_re.captures(output).and_then(pick);

    match (sent, received) {
        (Some(s), Some(r)) => (Some(s), Some(r)),
        _ => (None, None),
    }
}
