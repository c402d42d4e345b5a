//! Connection configuration.

use std::fmt;

/// Which side initiates the TCP connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Host. Binds a port and waits for exactly one peer.
    Listener,
    /// Joiner. Dials the host once.
    Dialer,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Listener => write!(f, "host"),
            Role::Dialer => write!(f, "join"),
        }
    }
}

/// Configuration for establishing a chat session.
///
/// Values are always supplied at runtime by a human; there are no defaults
/// at this layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectConfig {
    /// Role in the session.
    pub role: Role,
    /// Host to dial. Empty for the listener role.
    pub host: String,
    /// Port to bind (listener) or dial (dialer).
    pub port: u16,
}

impl ConnectConfig {
    /// Create a new configuration for hosting on `port` (all interfaces).
    pub fn host(port: u16) -> Self {
        Self {
            role: Role::Listener,
            host: String::new(),
            port,
        }
    }

    /// Create a new configuration for joining `host:port`.
    pub fn join(host: impl Into<String>, port: u16) -> Self {
        Self {
            role: Role::Dialer,
            host: host.into(),
            port,
        }
    }

    /// Human-readable target, e.g. `localhost:5000` or `[::1]:5000`.
    pub fn target(&self) -> String {
        match self.role {
            Role::Listener => format!("0.0.0.0:{}", self.port),
            Role::Dialer => format_target(&self.host, self.port),
        }
    }
}

/// Join host and port, bracketing IPv6 literals.
pub(crate) fn format_target(host: &str, port: u16) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    }
}
