//! Core errors.
//!
//! These cover misuse caught before any network action takes place.
//! Network faults live in `peerchat-transport`.

use thiserror::Error;

use crate::state::SessionState;

/// Errors raised by the I/O-free rules of a chat session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// User-supplied port is not a number in `0..=65535`.
    #[error("Invalid port number.")]
    InvalidPort(String),

    /// Lifecycle transition not allowed from the current state.
    #[error("cannot {action} while {from:?}")]
    InvalidTransition {
        /// State the session was in.
        from: SessionState,
        /// Transition that was attempted.
        action: &'static str,
    },
}
