//! peerchat core
//!
//! I/O-free rules shared by every peerchat front-end:
//! - Session lifecycle state machine (Idle → Establishing → Connected → Disconnected)
//! - Newline-delimited line codec
//! - Outgoing message validation
//! - Port parsing for user-supplied input
//!
//! # Invariants
//!
//! - Disconnected is terminal. There is no reconnection.
//! - Leaving Connected happens exactly once per session.
//! - Blank input never reaches the wire.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::panic))]

pub mod error;
pub mod line;
pub mod port;
pub mod state;

pub use error::CoreError;
pub use line::{decode_line, encode_line, OutgoingMessage};
pub use port::parse_port;
pub use state::{Lifecycle, SessionState};
