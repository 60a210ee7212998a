//! Connection state machine types.

use std::time::Instant;

use thiserror::Error;

/// Why a connect attempt ended without a working tunnel.
///
/// The classified variants are derived from best-effort matching of the
/// client's log output, not from an authoritative protocol signal.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FailureReason {
    /// The server rejected the supplied credentials.
    #[error("authentication failed: invalid credentials")]
    AuthFailed,
    /// TLS handshake or certificate verification failed.
    #[error("certificate or TLS error")]
    TlsError,
    /// The server hostname could not be resolved.
    #[error("could not resolve server")]
    DnsError,
    /// The server was unreachable, refused, or timed out.
    #[error("network connection failed")]
    NetworkError,
    /// The client logged a FATAL line; carries the offending line.
    #[error("fatal error: {0}")]
    Fatal(String),
    /// The client exited before reaching any recognized outcome.
    #[error("process terminated unexpectedly (exit code: {})", .0.map_or_else(|| "unknown".to_string(), |c| c.to_string()))]
    Terminated(Option<i32>),
    /// The client process could not be started at all.
    #[error("launch failed: {0}")]
    Launch(String),
}

impl FailureReason {
    /// A remediation hint matching the failure class, shown alongside the
    /// error message.
    pub fn hint(&self) -> &'static str {
        match self {
            Self::AuthFailed => "Verify the username and password stored in the profile.",
            Self::TlsError => "Check that the certificate in the config is valid and not expired.",
            Self::DnsError => "Check DNS settings and that the server hostname is correct.",
            Self::NetworkError => "Check your internet connection and that the server is reachable.",
            Self::Fatal(_) | Self::Terminated(_) => {
                "Inspect the log output above for the client's own diagnostics."
            }
            Self::Launch(_) => "Ensure openvpn is installed and you have sufficient privileges.",
        }
    }
}

/// Supervisor-level connection state.
///
/// The tick handler and the session worker are the only writers; terminal
/// states return to Idle once teardown completes or the failure is
/// acknowledged.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum ConnectionState {
    /// No active session.
    #[default]
    Idle,
    /// Subprocess launched, waiting for the classifier's verdict.
    Connecting {
        /// When the attempt started.
        since: Instant,
    },
    /// Tunnel established.
    Connected {
        /// When the tunnel came up.
        since: Instant,
        /// Detected virtual interface, when the log revealed one.
        interface: Option<String>,
    },
    /// Teardown in progress.
    Disconnecting {
        /// When teardown started; bounds how long the UI waits.
        since: Instant,
    },
    /// Attempt failed; waiting for acknowledgement.
    Failed(FailureReason),
}

impl ConnectionState {
    /// Whether a session currently holds the subprocess slot. Starting a new
    /// connection is only permitted when this is false.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            Self::Connecting { .. } | Self::Connected { .. } | Self::Disconnecting { .. }
        )
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected { .. })
    }
}
