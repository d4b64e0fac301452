//! UDP transport.
//!
//! Each exchange binds its own socket, frames it with [`EnvelopeCodec`],
//! sends once and waits for one datagram:
//!
//! ```text
//! DeviceSession ──send()──> UdpTransport ──(UDP :7000)──> device
//!                               │
//!                               └─> UdpFramed<EnvelopeCodec>
//! ```
//!
//! The socket lives inside the call, so it is released exactly once on
//! whichever path finishes first: reply, timeout or error. Nothing is
//! pooled or reused between calls.

use futures::{SinkExt, StreamExt};
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::Instant;
use tokio_util::udp::UdpFramed;
use tracing::{debug, trace, warn};

use crate::transport::{Transport, TransportError};
use airlink_core::constants::DEFAULT_RESPONSE_TIMEOUT_MS;
use airlink_protocol::{Envelope, EnvelopeCodec, scan_request};

/// Configuration for [`UdpTransport`].
///
/// # Example
///
/// ```
/// use airlink_network::UdpTransportConfig;
/// use std::time::Duration;
///
/// let config = UdpTransportConfig {
///     timeout: Duration::from_millis(500),
///     broadcast: true,
///     ..Default::default()
/// };
/// assert_eq!(config.bind_addr.port(), 0);
/// ```
#[derive(Debug, Clone)]
pub struct UdpTransportConfig {
    /// How long to wait for the reply datagram
    pub timeout: Duration,

    /// Local address each exchange binds to
    pub bind_addr: SocketAddr,

    /// Enable `SO_BROADCAST`, required when sending to a broadcast address
    pub broadcast: bool,
}

impl Default for UdpTransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(DEFAULT_RESPONSE_TIMEOUT_MS),
            bind_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)),
            broadcast: false,
        }
    }
}

/// Datagram transport with a fresh socket per exchange.
#[derive(Debug, Clone, Default)]
pub struct UdpTransport {
    config: UdpTransportConfig,
}

impl UdpTransport {
    pub fn new(config: UdpTransportConfig) -> Self {
        debug!(
            bind_addr = %config.bind_addr,
            timeout_ms = config.timeout.as_millis() as u64,
            "Creating UDP transport"
        );
        Self { config }
    }

    pub fn config(&self) -> &UdpTransportConfig {
        &self.config
    }

    async fn open(&self) -> Result<UdpFramed<EnvelopeCodec>, TransportError> {
        let socket = UdpSocket::bind(self.config.bind_addr).await?;
        if self.config.broadcast {
            socket.set_broadcast(true)?;
        }
        Ok(UdpFramed::new(socket, EnvelopeCodec::new()))
    }

    /// Send one scan and collect every reply that arrives within `window`.
    ///
    /// Intended for broadcast discovery, where several devices may answer
    /// the same request. Replies that fail to decode are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket cannot be bound or the scan cannot be
    /// sent.
    pub async fn discover(
        &self,
        addr: SocketAddr,
        window: Duration,
    ) -> Result<Vec<(Envelope, SocketAddr)>, TransportError> {
        let mut framed = self.open().await?;
        framed.send((scan_request(), addr)).await?;
        debug!(%addr, window_ms = window.as_millis() as u64, "Scan sent, collecting replies");

        let deadline = Instant::now() + window;
        let mut replies = Vec::new();

        loop {
            match tokio::time::timeout_at(deadline, framed.next()).await {
                Ok(Some(Ok((reply, from)))) => {
                    trace!(%from, kind = %reply.kind, "Discovery reply");
                    replies.push((reply, from));
                }
                Ok(Some(Err(e))) => warn!(error = %e, "Skipping undecodable discovery reply"),
                Ok(None) | Err(_) => break,
            }
        }

        debug!(count = replies.len(), "Discovery finished");
        Ok(replies)
    }
}

impl Transport for UdpTransport {
    async fn send(
        &self,
        request: Envelope,
        addr: SocketAddr,
    ) -> Result<Option<Envelope>, TransportError> {
        let mut framed = self.open().await?;

        trace!(%addr, kind = %request.kind, "Sending request");
        framed.send((request, addr)).await?;

        match tokio::time::timeout(self.config.timeout, framed.next()).await {
            Ok(Some(Ok((reply, from)))) => {
                trace!(%from, kind = %reply.kind, "Received reply");
                Ok(Some(reply))
            }
            Ok(Some(Err(e))) => {
                warn!(%addr, error = %e, "Failed to decode reply");
                Err(e.into())
            }
            Ok(None) => Ok(None),
            Err(_) => {
                debug!(
                    %addr,
                    timeout_ms = self.config.timeout.as_millis() as u64,
                    "No reply before timeout"
                );
                Ok(None)
            }
        }
    }
}
