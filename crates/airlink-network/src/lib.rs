//! Network transport for the air-conditioner LAN protocol.
//!
//! This crate provides the [`Transport`] seam the session drives and its UDP
//! implementation. Every exchange is one request datagram followed by a
//! single wait for the first reply; retries are the caller's business.
//!
//! # Example
//!
//! ```no_run
//! use airlink_network::{Transport, UdpTransport, UdpTransportConfig};
//! use airlink_protocol::{parse_scan_reply, scan_request};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = UdpTransport::new(UdpTransportConfig {
//!     timeout: Duration::from_millis(2000),
//!     ..Default::default()
//! });
//!
//! let addr = "192.168.1.50:7000".parse()?;
//! if let Some(reply) = transport.send(scan_request(), addr).await? {
//!     println!("found {}", parse_scan_reply(&reply, addr)?);
//! }
//! # Ok(())
//! # }
//! ```

mod transport;
mod udp;

pub use transport::{Transport, TransportError};
pub use udp::{UdpTransport, UdpTransportConfig};
