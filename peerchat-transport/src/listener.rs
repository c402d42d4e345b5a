//! Listener role: bind, accept exactly one peer, stop accepting.

use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use tokio::net::{lookup_host, TcpListener};
use tracing::{debug, info};

use crate::error::TransportError;
use crate::transport::Transport;

/// A bound listening socket waiting for its single peer.
#[derive(Debug)]
pub struct Listener {
    inner: TcpListener,
    local: SocketAddr,
}

/// What the host can show before it starts waiting.
#[derive(Debug)]
pub struct ListenNotice {
    /// Port actually bound (differs from the request when 0 was asked).
    pub port: u16,
    /// Best-effort displayable local address.
    pub address: io::Result<IpAddr>,
}

impl Listener {
    /// Bind `port` on all local interfaces.
    pub async fn bind(port: u16) -> Result<Self, TransportError> {
        Self::bind_addr(SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port)).await
    }

    /// Bind a specific local address.
    pub async fn bind_addr(addr: SocketAddr) -> Result<Self, TransportError> {
        let inner = TcpListener::bind(addr)
            .await
            .map_err(|source| TransportError::Bind { addr, source })?;
        let local = inner
            .local_addr()
            .map_err(|source| TransportError::Bind { addr, source })?;

        info!(%local, "listening for one peer");
        Ok(Self { inner, local })
    }

    /// Bound local address.
    pub fn local_addr(&self) -> SocketAddr {
        self.local
    }

    /// Bound port.
    pub fn port(&self) -> u16 {
        self.local.port()
    }

    /// Resolve an address a human can give to the peer.
    ///
    /// A listener bound to a concrete IP reports that IP. Otherwise the
    /// machine's hostname is resolved and the first non-loopback IPv4
    /// address wins, falling back to whatever resolved first.
    pub async fn display_address(&self) -> io::Result<IpAddr> {
        if !self.local.ip().is_unspecified() {
            return Ok(self.local.ip());
        }

        let name = hostname::get()?
            .into_string()
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "hostname is not UTF-8"))?;
        let candidates: Vec<IpAddr> = lookup_host((name.as_str(), 0))
            .await?
            .map(|addr| addr.ip())
            .collect();

        candidates
            .iter()
            .find(|ip| ip.is_ipv4() && !ip.is_loopback())
            .or_else(|| candidates.first())
            .copied()
            .ok_or_else(|| {
                io::Error::new(io::ErrorKind::NotFound, format!("{name} has no addresses"))
            })
    }

    /// Gather what should be announced before blocking in `accept_one`.
    pub async fn notice(&self) -> ListenNotice {
        ListenNotice {
            port: self.port(),
            address: self.display_address().await,
        }
    }

    /// Wait for exactly one peer.
    ///
    /// Consumes the listener: the listening socket is closed as soon as the
    /// peer is accepted, so nobody else can connect.
    pub async fn accept_one(self) -> Result<Transport, TransportError> {
        let (stream, peer) = self.inner.accept().await.map_err(TransportError::Accept)?;
        info!(%peer, "peer accepted");
        debug!(local = %self.local, "listening socket closed");
        Ok(Transport::open(stream))
    }
}

/// Bind `port`, announce it through `ready`, then accept one peer.
pub async fn listen<F>(port: u16, ready: F) -> Result<Transport, TransportError>
where
    F: FnOnce(&ListenNotice),
{
    let listener = Listener::bind(port).await?;
    ready(&listener.notice().await);
    listener.accept_one().await
}
