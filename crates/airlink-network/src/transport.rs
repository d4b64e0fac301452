//! The request/response seam between the session and the network.

use airlink_protocol::Envelope;
use std::future::Future;
use std::net::SocketAddr;
use thiserror::Error;

/// Errors that can occur during a single exchange.
///
/// A missing reply is not an error; [`Transport::send`] reports it as
/// `Ok(None)`.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Reply could not be decoded, or the request could not be encoded
    #[error("Protocol error: {0}")]
    Protocol(#[from] airlink_core::Error),

    /// Low-level socket error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// One-shot request/response exchange with a device.
///
/// Implementations send `request` to `addr` exactly once and resolve with
/// the first reply, or `None` once their response timeout elapses. They
/// never retransmit.
pub trait Transport: Send + Sync + 'static {
    fn send(
        &self,
        request: Envelope,
        addr: SocketAddr,
    ) -> impl Future<Output = Result<Option<Envelope>, TransportError>> + Send;
}
