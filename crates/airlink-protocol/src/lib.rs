//! Wire codec for the air-conditioner LAN protocol.
//!
//! # Layers
//!
//! ```text
//! Request (inner JSON) -> pad -> AES-128-ECB -> base64 -> Envelope.pack
//! Envelope (outer JSON) <-> one UDP datagram (EnvelopeCodec)
//! ```
//!
//! Outer envelope fields are always plain JSON; only `pack` is encrypted.

pub mod builder;
pub mod cipher;
pub mod codec;
pub mod envelope;
pub mod padding;
pub mod parser;
pub mod reply;
pub mod request;

pub use builder::{PackBuilder, bind_request, command_request, scan_request, status_request};
pub use cipher::PackCipher;
pub use codec::EnvelopeCodec;
pub use envelope::{Envelope, MessageType};
pub use padding::{pad, unpad};
pub use parser::{
    ReplyParser, parse_bind_reply, parse_command_reply, parse_scan_reply, parse_status_reply,
};
pub use reply::{BindReply, CommandReply, ScanReply, StatusReply};
pub use request::Request;
