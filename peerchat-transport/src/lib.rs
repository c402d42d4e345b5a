//! peerchat transport
//!
//! Async connection and session engine for peerchat.
//!
//! This crate wraps `peerchat-core` and provides:
//! - [`Transport`]: newline-delimited text over one TCP stream
//! - [`Listener`] / [`listen`]: host role, exactly one peer
//! - [`dial`]: join role, one connection attempt
//! - [`Session`]: lifecycle, concurrent receive loop, send path
//! - [`Bridge`] / [`Presentation`]: the seam to whatever renders the chat
//!
//! # Failure Semantics
//!
//! Network faults never escape a [`Session`]. Establishment failures and
//! peer loss end the session and are reported to the presentation; write
//! failures are reported and survived. Nothing is retried.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::panic))]

pub mod bridge;
pub mod config;
pub mod dialer;
pub mod error;
pub mod listener;
pub mod session;
pub mod transport;

pub use bridge::{Bridge, ChannelPresentation, Presentation, UiEvent};
pub use config::{ConnectConfig, Role};
pub use dialer::dial;
pub use error::{ConnectReason, SessionError, TransportError};
pub use listener::{listen, ListenNotice, Listener};
pub use session::Session;
pub use transport::{LineReader, LineWriter, Transport};
