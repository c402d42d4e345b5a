//! Bridge between a session and its presentation layer.
//!
//! The session never touches UI state. It reports through [`Bridge`], which
//! owns the wording of every notice and forwards it to a [`Presentation`].
//! Presentations are called from whichever task produced the event and must
//! hand work over to their own rendering context themselves;
//! [`ChannelPresentation`] does that by message passing.

use std::io;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::trace;

use crate::config::{format_target, Role};
use crate::error::TransportError;
use crate::listener::ListenNotice;

/// Presentation collaborator driven by the session.
///
/// All methods may be called from any task and must not block.
pub trait Presentation: Send + Sync + 'static {
    /// Informational lifecycle notice (waiting, connecting, connected, disconnected).
    fn on_status(&self, text: &str);
    /// A line arrived from the peer.
    fn on_message_received(&self, text: &str);
    /// Echo of a line the local user submitted.
    fn on_message_sent(&self, text: &str);
    /// User-visible failure.
    fn on_error(&self, text: &str);
    /// Enable or disable the input surface.
    fn set_input_enabled(&self, enabled: bool);
}

/// One presentation call, as a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    /// See [`Presentation::on_status`].
    Status(String),
    /// See [`Presentation::on_message_received`].
    MessageReceived(String),
    /// See [`Presentation::on_message_sent`].
    MessageSent(String),
    /// See [`Presentation::on_error`].
    Error(String),
    /// See [`Presentation::set_input_enabled`].
    InputEnabled(bool),
}

/// Presentation that forwards every call over an unbounded channel.
///
/// The receiving end is drained by the UI loop on its own task, so the
/// session never waits for rendering.
#[derive(Debug, Clone)]
pub struct ChannelPresentation {
    tx: mpsc::UnboundedSender<UiEvent>,
}

impl ChannelPresentation {
    /// Create the presentation and the receiver the UI loop should drain.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<UiEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn forward(&self, event: UiEvent) {
        if self.tx.send(event).is_err() {
            trace!("ui gone, event dropped");
        }
    }
}

impl Presentation for ChannelPresentation {
    fn on_status(&self, text: &str) {
        self.forward(UiEvent::Status(text.to_string()));
    }

    fn on_message_received(&self, text: &str) {
        self.forward(UiEvent::MessageReceived(text.to_string()));
    }

    fn on_message_sent(&self, text: &str) {
        self.forward(UiEvent::MessageSent(text.to_string()));
    }

    fn on_error(&self, text: &str) {
        self.forward(UiEvent::Error(text.to_string()));
    }

    fn set_input_enabled(&self, enabled: bool) {
        self.forward(UiEvent::InputEnabled(enabled));
    }
}

/// Session-side adapter over a [`Presentation`].
#[derive(Clone)]
pub struct Bridge {
    presentation: Arc<dyn Presentation>,
}

impl std::fmt::Debug for Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge").finish_non_exhaustive()
    }
}

impl Bridge {
    /// Wrap a presentation.
    pub fn new(presentation: impl Presentation) -> Self {
        Self {
            presentation: Arc::new(presentation),
        }
    }

    pub(crate) fn listening(&self, notice: &ListenNotice) {
        self.status(&format!(
            "Waiting for a peer to connect on port {}...",
            notice.port
        ));
        self.status(&local_address_line(&notice.address));
    }

    pub(crate) fn peer_accepted(&self, peer: Option<SocketAddr>) {
        match peer {
            Some(addr) => self.status(&format!("Peer connected! ({addr})")),
            None => self.status("Peer connected!"),
        }
    }

    pub(crate) fn connecting(&self, host: &str, port: u16) {
        self.status(&format!("Connecting to {}...", format_target(host, port)));
    }

    pub(crate) fn dialed(&self) {
        self.status("Connected to peer!");
    }

    pub(crate) fn establish_failed(&self, role: Role, err: &TransportError) {
        let text = match role {
            Role::Listener => format!("Host connection error: {err}"),
            Role::Dialer => format!("Client connection error: {err}"),
        };
        self.presentation.on_error(&text);
    }

    pub(crate) fn peer_lost(&self) {
        self.status("Peer has disconnected.");
    }

    pub(crate) fn hung_up(&self) {
        self.status("Disconnected.");
    }

    pub(crate) fn received(&self, text: &str) {
        self.presentation.on_message_received(text);
    }

    pub(crate) fn sent(&self, text: &str) {
        self.presentation.on_message_sent(text);
    }

    pub(crate) fn send_failed(&self, err: &TransportError) {
        self.presentation
            .on_error(&format!("Failed to send message: {err}"));
    }

    pub(crate) fn input_enabled(&self, enabled: bool) {
        self.presentation.set_input_enabled(enabled);
    }

    fn status(&self, text: &str) {
        self.presentation.on_status(text);
    }
}

fn local_address_line(address: &io::Result<IpAddr>) -> String {
    match address {
        Ok(ip) => format!("IP: {ip}"),
        Err(e) => format!("IP: unavailable ({e})"),
    }
}
