//! Datagram codec for [`Envelope`]s.
//!
//! One datagram carries exactly one JSON envelope, so the decoder consumes
//! the whole buffer on every call. Intended for `tokio_util::udp::UdpFramed`:
//!
//! ```rust,no_run
//! use futures::{SinkExt, StreamExt};
//! use tokio::net::UdpSocket;
//! use tokio_util::udp::UdpFramed;
//! use airlink_protocol::{EnvelopeCodec, scan_request};
//!
//! # async fn example() -> airlink_core::Result<()> {
//! let socket = UdpSocket::bind("0.0.0.0:0").await?;
//! let mut framed = UdpFramed::new(socket, EnvelopeCodec::new());
//!
//! framed.send((scan_request(), "192.168.1.50:7000".parse().unwrap())).await?;
//! if let Some(Ok((reply, from))) = framed.next().await {
//!     println!("{from}: {reply:?}");
//! }
//! # Ok(())
//! # }
//! ```

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::envelope::Envelope;
use airlink_core::constants::MAX_DATAGRAM_SIZE;
use airlink_core::{Error, Result};

/// JSON envelope codec, one envelope per datagram.
#[derive(Debug, Clone)]
pub struct EnvelopeCodec {
    max_datagram_size: usize,
}

impl EnvelopeCodec {
    pub fn new() -> Self {
        Self {
            max_datagram_size: MAX_DATAGRAM_SIZE,
        }
    }

    pub fn with_max_datagram_size(max_datagram_size: usize) -> Self {
        Self { max_datagram_size }
    }

    pub fn max_datagram_size(&self) -> usize {
        self.max_datagram_size
    }
}

impl Default for EnvelopeCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for EnvelopeCodec {
    type Item = Envelope;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Envelope>> {
        if src.is_empty() {
            return Ok(None);
        }

        // Consume the datagram whether or not it parses.
        let datagram = src.split();
        if datagram.len() > self.max_datagram_size {
            return Err(Error::InvalidEnvelope(format!(
                "datagram of {} bytes exceeds limit of {}",
                datagram.len(),
                self.max_datagram_size
            )));
        }

        serde_json::from_slice(&datagram)
            .map(Some)
            .map_err(|e| Error::InvalidEnvelope(e.to_string()))
    }
}

impl Encoder<Envelope> for EnvelopeCodec {
    type Error = Error;

    fn encode(&mut self, item: Envelope, dst: &mut BytesMut) -> Result<()> {
        let json = serde_json::to_vec(&item)?;
        dst.extend_from_slice(&json);
        Ok(())
    }
}
