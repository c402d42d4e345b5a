//! Dialer role: one connection attempt to `host:port`.

use std::io;

use tokio::net::{lookup_host, TcpStream};
use tracing::{debug, info};

use crate::config::format_target;
use crate::error::{ConnectReason, TransportError};
use crate::transport::Transport;

/// Connect to `host:port`.
///
/// The host is resolved once and each resolved address is tried once, in
/// resolver order. No retry and no timeout beyond the platform default.
pub async fn dial(host: &str, port: u16) -> Result<Transport, TransportError> {
    let target = format_target(host, port);

    if port == 0 {
        return Err(TransportError::Connect {
            target,
            reason: ConnectReason::InvalidPort,
            source: io::Error::new(io::ErrorKind::InvalidInput, "port 0 cannot be dialed"),
        });
    }

    let addrs: Vec<_> = match lookup_host((host, port)).await {
        Ok(addrs) => addrs.collect(),
        Err(source) => {
            return Err(TransportError::Connect {
                target,
                reason: ConnectReason::Resolve,
                source,
            })
        }
    };

    let mut last_err = None;
    for addr in addrs {
        debug!(%addr, "dialing");
        match TcpStream::connect(addr).await {
            Ok(stream) => {
                info!(%addr, "connected to peer");
                return Ok(Transport::open(stream));
            }
            Err(e) => {
                debug!(%addr, error = %e, "dial attempt failed");
                last_err = Some(e);
            }
        }
    }

    match last_err {
        Some(source) => Err(TransportError::Connect {
            target,
            reason: ConnectReason::classify(&source),
            source,
        }),
        None => Err(TransportError::Connect {
            target,
            reason: ConnectReason::Resolve,
            source: io::Error::new(io::ErrorKind::NotFound, "host resolved to no addresses"),
        }),
    }
}
