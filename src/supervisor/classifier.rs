//! Log stream classification.
//!
//! Maps the client's merged stdout/stderr lines onto a terminal verdict.
//! Matching is best-effort substring matching against an external program's
//! unversioned text output; the phrase lists live in a table so new phrases
//! can be added without touching control flow.

use regex::Regex;

use crate::state::FailureReason;

/// Terminal outcome latched from the log stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Verdict {
    /// Handshake completed; carries the interface name if the log revealed one.
    Connected {
        /// Detected virtual interface (e.g. `tun0`).
        interface: Option<String>,
    },
    /// A failure phrase matched.
    Failed(FailureReason),
}

/// What a matched phrase group means.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LineClass {
    Connected,
    AuthFailed,
    TlsError,
    DnsError,
    NetworkError,
    Fatal,
}

/// Ordered phrase groups; the first group with a matching phrase wins the line.
const CLASSIFICATION_TABLE: &[(&[&str], LineClass)] = &[
    (
        &[
            "Initialization Sequence Completed",
            "Sequence Completed",
            "VPN tunnel is ready",
        ],
        LineClass::Connected,
    ),
    (
        &["AUTH_FAILED", "Authentication failed"],
        LineClass::AuthFailed,
    ),
    (
        &[
            "TLS Error",
            "TLS handshake failed",
            "Certificate verification failed",
        ],
        LineClass::TlsError,
    ),
    (
        &[
            "Cannot resolve host address",
            "Name resolution failure",
            "RESOLVE:",
        ],
        LineClass::DnsError,
    ),
    (
        &[
            "Connection refused",
            "Connection timed out",
            "Network is unreachable",
        ],
        LineClass::NetworkError,
    ),
    (&["FATAL"], LineClass::Fatal),
];

/// Stateful line classifier for one session's log stream.
pub struct LogClassifier {
    tun_device: Regex,
    ipv6_remote: Regex,
    interface: Option<String>,
    latched: bool,
}

impl Default for LogClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl LogClassifier {
    pub fn new() -> Self {
        Self {
            tun_device: Regex::new(r"TUN/TAP device (\w+) opened").unwrap(),
            ipv6_remote: Regex::new(r"ifconfig_ipv6_remote: (\w+)").unwrap(),
            interface: None,
            latched: false,
        }
    }

    /// The interface name seen so far, if any.
    pub fn interface(&self) -> Option<&str> {
        self.interface.as_deref()
    }

    /// Whether a terminal verdict has already been reached.
    pub fn is_latched(&self) -> bool {
        self.latched
    }

    /// Feed one log line. Returns `Some` exactly once, on the line that
    /// latches a verdict; every later line is ignored.
    pub fn observe(&mut self, line: &str) -> Option<Verdict> {
        if self.latched {
            return None;
        }

        // Interface detection runs before classification so a line that both
        // names the device and completes the sequence still yields the name.
        if self.interface.is_none() {
            if let Some(caps) = self
                .tun_device
                .captures(line)
                .or_else(|| self.ipv6_remote.captures(line))
            {
                self.interface = Some(caps[1].to_string());
            }
        }

        let class = CLASSIFICATION_TABLE
            .iter()
            .find(|(phrases, _)| phrases.iter().any(|p| line.contains(p)))
            .map(|(_, class)| *class)?;

        self.latched = true;
        Some(match class {
            LineClass::Connected => Verdict::Connected {
                interface: self.interface.clone(),
            },
            LineClass::AuthFailed => Verdict::Failed(FailureReason::AuthFailed),
            LineClass::TlsError => Verdict::Failed(FailureReason::TlsError),
            LineClass::DnsError => Verdict::Failed(FailureReason::DnsError),
            LineClass::NetworkError => Verdict::Failed(FailureReason::NetworkError),
            LineClass::Fatal => Verdict::Failed(FailureReason::Fatal(line.to_string())),
        })
    }
}
