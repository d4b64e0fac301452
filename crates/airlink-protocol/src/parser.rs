//! Reply parsing: decrypt a reply envelope and interpret its pack.

use chrono::Utc;
use serde::de::DeserializeOwned;
use std::net::SocketAddr;

use crate::cipher::PackCipher;
use crate::envelope::Envelope;
use crate::reply::{BindReply, CommandReply, ScanReply, StatusReply};
use airlink_core::{DeviceIdentity, ParameterSet, Result, SessionKey};

/// Decrypts reply packs with one key.
#[derive(Debug, Clone)]
pub struct ReplyParser {
    cipher: PackCipher,
}

impl ReplyParser {
    pub fn generic() -> Self {
        Self {
            cipher: PackCipher::generic(),
        }
    }

    pub fn session(key: &SessionKey) -> Self {
        Self {
            cipher: PackCipher::new(key),
        }
    }

    /// Decrypt the pack of `envelope` into `T`.
    ///
    /// # Errors
    /// Fails if the envelope is not a pack message, has no pack, or the
    /// pack does not decrypt into `T`.
    pub fn parse<T: DeserializeOwned>(&self, envelope: &Envelope) -> Result<T> {
        self.cipher.decrypt(envelope.pack_payload()?)
    }
}

/// Interpret a scan reply received from `from`.
pub fn parse_scan_reply(envelope: &Envelope, from: SocketAddr) -> Result<DeviceIdentity> {
    ReplyParser::generic()
        .parse::<ScanReply>(envelope)?
        .into_identity(from)
}

/// Extract the session key from a bind reply.
pub fn parse_bind_reply(envelope: &Envelope) -> Result<SessionKey> {
    ReplyParser::generic()
        .parse::<BindReply>(envelope)?
        .session_key()
}

/// Decode a status reply into a parameter snapshot stamped with the current time.
pub fn parse_status_reply(envelope: &Envelope, key: &SessionKey) -> Result<ParameterSet> {
    ReplyParser::session(key)
        .parse::<StatusReply>(envelope)?
        .to_parameter_set(Utc::now())
}

/// Decode a command result and check the device accepted it.
pub fn parse_command_reply(envelope: &Envelope, key: &SessionKey) -> Result<CommandReply> {
    let reply = ReplyParser::session(key).parse::<CommandReply>(envelope)?;
    reply.check()?;
    Ok(reply)
}
