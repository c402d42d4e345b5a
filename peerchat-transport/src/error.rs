//! Transport and session errors.

use std::fmt;
use std::io;
use std::net::SocketAddr;

use peerchat_core::SessionState;
use thiserror::Error;

/// Errors that can occur while establishing or using a transport.
///
/// Establishment errors (`Bind`, `Accept`, `Connect`) end that attempt.
/// `Read` and `LineTooLong` end the session. `Write` and `Closed` are reported and survived.
#[derive(Debug, Error)]
pub enum TransportError {
    // --- Establishment ---
    /// Port unavailable or not bindable.
    #[error("cannot bind {addr}: {source}")]
    Bind {
        /// Address the listener tried to bind.
        addr: SocketAddr,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// Accept interrupted or listening socket closed.
    #[error("accept failed: {0}")]
    Accept(#[source] io::Error),
    /// Single connection attempt failed.
    #[error("cannot connect to {target}: {reason} ({source})")]
    Connect {
        /// `host:port` that was dialed.
        target: String,
        /// Classified cause.
        reason: ConnectReason,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    // --- Connected ---
    /// Abnormal read fault (anything except graceful end-of-stream).
    #[error("read failed: {0}")]
    Read(#[source] io::Error),
    /// Peer sent more than `limit` bytes without a line terminator.
    #[error("incoming line exceeds {limit} bytes")]
    LineTooLong {
        /// Longest accepted line.
        limit: usize,
    },
    /// Write or flush failed.
    #[error("write failed: {0}")]
    Write(#[source] io::Error),
    /// Transport was already closed locally.
    #[error("transport closed")]
    Closed,
}

/// Why a dial attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectReason {
    /// Nothing is listening at the target.
    Refused,
    /// Host or network unreachable, or the attempt timed out at OS level.
    Unreachable,
    /// Host name could not be resolved.
    Resolve,
    /// Port cannot be dialed.
    InvalidPort,
    /// Anything else.
    Other,
}

impl ConnectReason {
    /// Classify an I/O error from a connect attempt.
    pub fn classify(err: &io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::ConnectionRefused => Self::Refused,
            io::ErrorKind::HostUnreachable
            | io::ErrorKind::NetworkUnreachable
            | io::ErrorKind::TimedOut
            | io::ErrorKind::AddrNotAvailable => Self::Unreachable,
            _ => Self::Other,
        }
    }
}

impl fmt::Display for ConnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Refused => write!(f, "connection refused"),
            Self::Unreachable => write!(f, "host unreachable"),
            Self::Resolve => write!(f, "name resolution failed"),
            Self::InvalidPort => write!(f, "invalid port"),
            Self::Other => write!(f, "connection failed"),
        }
    }
}

/// Misuse of the session entry points.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A role was already chosen for this session.
    #[error("session already started (state: {0:?})")]
    AlreadyStarted(SessionState),
    /// Called outside a Tokio runtime.
    #[error("no tokio runtime available to run the session")]
    NoRuntime,
}
