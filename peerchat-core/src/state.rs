//! Session lifecycle state machine.
//!
//! States: IDLE → ESTABLISHING → CONNECTED → DISCONNECTED
//!
//! ESTABLISHING may also fall straight to DISCONNECTED when the role fails.
//! DISCONNECTED is final. No re-entry, no reconnection.

use crate::error::CoreError;

/// Session state enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No role chosen yet, no transport.
    Idle,
    /// Listener or dialer role in progress.
    Establishing,
    /// Transport live, receive loop running, send path enabled.
    Connected,
    /// Transport closed, send path disabled. Final state.
    Disconnected,
}

impl SessionState {
    /// Short label for status bars.
    pub fn label(self) -> &'static str {
        match self {
            Self::Idle => "IDLE",
            Self::Establishing => "ESTABLISHING",
            Self::Connected => "CONNECTED",
            Self::Disconnected => "DISCONNECTED",
        }
    }
}

/// Lifecycle of one chat session.
///
/// Pure bookkeeping: the transport crate drives it and performs the I/O.
/// Transitions that can race (peer loss vs. local hang-up) return whether
/// this call performed the transition so that exactly one caller reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lifecycle {
    state: SessionState,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    /// Create a lifecycle in the Idle state.
    pub fn new() -> Self {
        Self {
            state: SessionState::Idle,
        }
    }

    /// Get current state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Whether the send path is enabled.
    pub fn is_connected(&self) -> bool {
        self.state == SessionState::Connected
    }

    /// Whether the session reached its final state.
    pub fn is_disconnected(&self) -> bool {
        self.state == SessionState::Disconnected
    }

    /// Role chosen by the human.
    ///
    /// Transitions: Idle → Establishing
    pub fn begin(&mut self) -> Result<(), CoreError> {
        self.expect(SessionState::Idle, "start establishing")?;
        self.state = SessionState::Establishing;
        Ok(())
    }

    /// Role produced a transport.
    ///
    /// Transitions: Establishing → Connected
    pub fn established(&mut self) -> Result<(), CoreError> {
        self.expect(SessionState::Establishing, "mark connected")?;
        self.state = SessionState::Connected;
        Ok(())
    }

    /// Role failed before any transport existed.
    ///
    /// Transitions: Establishing → Disconnected
    pub fn establish_failed(&mut self) -> Result<(), CoreError> {
        self.expect(SessionState::Establishing, "fail establishing")?;
        self.state = SessionState::Disconnected;
        Ok(())
    }

    /// Transport lost or closed locally.
    ///
    /// Transitions: Idle | Establishing | Connected → Disconnected.
    /// Returns `true` only for the call that performed the transition.
    pub fn disconnect(&mut self) -> bool {
        if self.state == SessionState::Disconnected {
            return false;
        }
        self.state = SessionState::Disconnected;
        true
    }

    fn expect(&self, required: SessionState, action: &'static str) -> Result<(), CoreError> {
        if self.state != required {
            return Err(CoreError::InvalidTransition {
                from: self.state,
                action,
            });
        }
        Ok(())
    }
}
