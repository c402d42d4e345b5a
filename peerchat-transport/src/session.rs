//! Chat session API.
//!
//! The main public interface for establishing and running a conversation.
//!
//! # Invariants
//!
//! - `Session` does not implement `Clone`
//! - One role per session; `Disconnected` is final, a new chat needs a new `Session`
//! - The receive loop is the only reader and the sole detector of peer loss
//! - A failed write is reported but never ends the session
//! - Leaving `Connected` is reported to the presentation exactly once

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use peerchat_core::{Lifecycle, OutgoingMessage, SessionState};
use tokio::runtime::Handle;
use tokio::sync::{watch, Mutex as AsyncMutex};
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

use crate::bridge::Bridge;
use crate::config::{ConnectConfig, Role};
use crate::dialer::dial;
use crate::error::{SessionError, TransportError};
use crate::listener::Listener;
use crate::transport::{LineReader, LineWriter, Transport};

/// A two-party chat session.
///
/// Starts `Idle`. Choosing a role (`host`, `host_with`, `join`, `start`)
/// spawns the establishment on its own task; every outcome is reported
/// through the [`Bridge`]. All entry points must be called inside a Tokio
/// runtime.
pub struct Session {
    inner: Arc<Inner>,
}

// Explicitly NOT implementing Clone
// impl Clone for Session { ... } // FORBIDDEN

struct Inner {
    lifecycle: watch::Sender<Lifecycle>,
    bridge: Bridge,
    /// Send direction. Installed before the state becomes Connected.
    writer: AsyncMutex<Option<LineWriter>>,
    peer: OnceLock<SocketAddr>,
    tasks: Mutex<Vec<AbortHandle>>,
}

/// How the transport is going to be obtained.
enum Establish {
    Bind(u16),
    Bound(Listener),
    Dial { host: String, port: u16 },
}

impl Establish {
    fn role(&self) -> Role {
        match self {
            Establish::Bind(_) | Establish::Bound(_) => Role::Listener,
            Establish::Dial { .. } => Role::Dialer,
        }
    }
}

/// Why the session left `Connected`.
#[derive(Debug, Clone, Copy)]
enum Shutdown {
    PeerLost,
    HungUp,
}

impl Session {
    /// Create an idle session reporting to `bridge`.
    pub fn new(bridge: Bridge) -> Self {
        let (lifecycle, _) = watch::channel(Lifecycle::new());
        Self {
            inner: Arc::new(Inner {
                lifecycle,
                bridge,
                writer: AsyncMutex::new(None),
                peer: OnceLock::new(),
                tasks: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Host on `port` (all interfaces) and wait for one peer.
    pub fn host(&self, port: u16) -> Result<(), SessionError> {
        self.establish(Establish::Bind(port))
    }

    /// Host on an already-bound listener.
    pub fn host_with(&self, listener: Listener) -> Result<(), SessionError> {
        self.establish(Establish::Bound(listener))
    }

    /// Join the host at `host:port`.
    pub fn join(&self, host: impl Into<String>, port: u16) -> Result<(), SessionError> {
        self.establish(Establish::Dial {
            host: host.into(),
            port,
        })
    }

    /// Start the role described by `config`.
    pub fn start(&self, config: ConnectConfig) -> Result<(), SessionError> {
        match config.role {
            Role::Listener => self.host(config.port),
            Role::Dialer => self.join(config.host, config.port),
        }
    }

    fn establish(&self, plan: Establish) -> Result<(), SessionError> {
        let runtime = Handle::try_current().map_err(|_| SessionError::NoRuntime)?;

        let mut refused = None;
        self.inner.lifecycle.send_if_modified(|lc| match lc.begin() {
            Ok(()) => true,
            Err(_) => {
                refused = Some(lc.state());
                false
            }
        });
        if let Some(state) = refused {
            return Err(SessionError::AlreadyStarted(state));
        }

        info!(role = %plan.role(), "establishing");
        let inner = Arc::clone(&self.inner);
        let task = runtime.spawn(async move {
            let role = plan.role();
            match inner.obtain_transport(plan).await {
                Ok(transport) => inner.attach(transport).await,
                Err(e) => inner.establish_failed(role, &e),
            }
        });
        self.inner.track(task.abort_handle());
        Ok(())
    }

    /// Send one line typed by the local user.
    ///
    /// No-op unless `Connected`, and for empty or whitespace-only text.
    /// The text is echoed to the presentation whether or not the write
    /// succeeded; a failed write is reported as an error and the session
    /// stays `Connected`.
    pub async fn submit(&self, text: &str) {
        let Some(message) = OutgoingMessage::new(text) else {
            return;
        };

        let mut slot = self.inner.writer.lock().await;
        // Checked under the lock: shutdown moves to Disconnected before it
        // takes the writer, so a lost race ends here silently
        let connected = self.inner.lifecycle.borrow().is_connected();
        let Some(writer) = slot.as_mut().filter(|_| connected) else {
            debug!("submit ignored: not connected");
            return;
        };
        let result = writer.send(&message).await;

        match result {
            Ok(()) => debug!(len = message.as_str().len(), "line sent"),
            Err(e) => {
                warn!(error = %e, "send failed");
                self.inner.bridge.send_failed(&e);
            }
        }
        self.inner.bridge.sent(message.as_str());
    }

    /// Get current state.
    pub fn state(&self) -> SessionState {
        self.inner.lifecycle.borrow().state()
    }

    /// Check if the send path is enabled.
    pub fn is_connected(&self) -> bool {
        self.inner.lifecycle.borrow().is_connected()
    }

    /// Remote address of the live transport, once connected.
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.inner.peer.get().copied()
    }

    /// Resolve once the session is `Disconnected`.
    pub async fn closed(&self) {
        let mut rx = self.inner.lifecycle.subscribe();
        // The sender lives in `inner`, so this only ends on a real transition
        let _ = rx.wait_for(|lc| lc.is_disconnected()).await;
    }

    /// Hang up locally.
    ///
    /// Closes the transport, stops the establishment and receive tasks and
    /// moves to `Disconnected`. Idempotent.
    pub async fn close(&self) {
        self.inner.shutdown(Shutdown::HungUp).await;
        self.inner.abort_tasks();
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.inner.lifecycle.send_if_modified(|lc| lc.disconnect());
        self.inner.abort_tasks();
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state())
            .field("peer", &self.peer_addr())
            .finish()
    }
}

impl Inner {
    async fn obtain_transport(&self, plan: Establish) -> Result<Transport, TransportError> {
        match plan {
            Establish::Bind(port) => {
                let listener = Listener::bind(port).await?;
                self.accept_from(listener).await
            }
            Establish::Bound(listener) => self.accept_from(listener).await,
            Establish::Dial { host, port } => {
                self.bridge.connecting(&host, port);
                let transport = dial(&host, port).await?;
                self.bridge.dialed();
                Ok(transport)
            }
        }
    }

    async fn accept_from(&self, listener: Listener) -> Result<Transport, TransportError> {
        self.bridge.listening(&listener.notice().await);
        let transport = listener.accept_one().await?;
        self.bridge.peer_accepted(transport.peer_addr());
        Ok(transport)
    }

    /// Establishing → Connected, then start the receive loop.
    async fn attach(self: &Arc<Self>, transport: Transport) {
        let peer = transport.peer_addr();
        let (reader, writer) = transport.into_split();
        *self.writer.lock().await = Some(writer);

        if !self.lifecycle.send_if_modified(|lc| lc.established().is_ok()) {
            // Hung up while establishing
            if let Some(mut writer) = self.writer.lock().await.take() {
                writer.close().await;
            }
            return;
        }

        if let Some(addr) = peer {
            let _ = self.peer.set(addr);
        }
        info!(?peer, "connected");
        self.bridge.input_enabled(true);

        let task = tokio::spawn(receive_loop(Arc::clone(self), reader));
        self.track(task.abort_handle());
    }

    /// Establishing → Disconnected. No transport ever existed.
    fn establish_failed(&self, role: Role, err: &TransportError) {
        warn!(%role, error = %err, "establishment failed");
        if self.lifecycle.send_if_modified(|lc| lc.establish_failed().is_ok()) {
            self.bridge.establish_failed(role, err);
            self.bridge.input_enabled(false);
        }
    }

    /// Any state → Disconnected, reported once.
    async fn shutdown(&self, cause: Shutdown) {
        let mut was_connected = false;
        let transitioned = self.lifecycle.send_if_modified(|lc| {
            was_connected = lc.is_connected();
            lc.disconnect()
        });
        if !transitioned {
            return;
        }
        info!(?cause, "disconnected");

        match cause {
            Shutdown::PeerLost => self.bridge.peer_lost(),
            Shutdown::HungUp if was_connected => self.bridge.hung_up(),
            Shutdown::HungUp => {}
        }
        self.bridge.input_enabled(false);

        if let Some(mut writer) = self.writer.lock().await.take() {
            writer.close().await;
        }
    }

    fn track(&self, handle: AbortHandle) {
        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(handle);
    }

    fn abort_tasks(&self) {
        let handles = {
            let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
            std::mem::take(&mut *tasks)
        };
        for handle in handles {
            handle.abort();
        }
    }
}

/// Runs for the whole `Connected` lifetime. Its only exit is peer loss.
async fn receive_loop(inner: Arc<Inner>, mut reader: LineReader) {
    loop {
        match reader.receive_line().await {
            Ok(Some(line)) => {
                debug!(len = line.len(), "line received");
                inner.bridge.received(&line);
            }
            Ok(None) => {
                info!("peer closed the stream");
                break;
            }
            Err(e) => {
                warn!(error = %e, "read failed");
                break;
            }
        }
    }

    drop(reader);
    inner.shutdown(Shutdown::PeerLost).await;
}
