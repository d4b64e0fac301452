//! Request construction.
//!
//! Scan and bind go out as bare JSON. Once bound, [`PackBuilder`] encrypts
//! an inner [`Request`] with the session key and wraps it in a
//! device-addressed [`Envelope`]. The free functions cover the four request
//! shapes a session sends.
//!
//! # Examples
//!
//! ```
//! use airlink_core::{ParameterName, SessionKey};
//! use airlink_protocol::{PackBuilder, PackCipher, Request};
//! use serde_json::Value;
//!
//! let key: SessionKey = "Ab1Cd2Ef3Gh4Ij5K".parse().unwrap();
//! let envelope = PackBuilder::session("f4911e7aca7b", &key)
//!     .build(&Request::status("f4911e7aca7b", &[ParameterName::Power]))
//!     .unwrap();
//!
//! assert_eq!(envelope.tcid.as_deref(), Some("f4911e7aca7b"));
//! assert_eq!(envelope.sequence, Some(0));
//!
//! let inner: Value = PackCipher::new(&key).decrypt(envelope.pack.as_deref().unwrap()).unwrap();
//! assert_eq!(inner["t"], "status");
//! ```

use crate::cipher::PackCipher;
use crate::envelope::Envelope;
use crate::request::Request;
use airlink_core::constants::SESSION_PACK_SEQUENCE;
use airlink_core::{ParameterName, Result, SessionKey};

/// Builder for device-addressed pack envelopes.
#[derive(Debug, Clone)]
pub struct PackBuilder {
    tcid: String,
    cipher: PackCipher,
    sequence: u32,
}

impl PackBuilder {
    /// Builder for packs encrypted with a negotiated session key.
    pub fn session(tcid: impl Into<String>, key: &SessionKey) -> Self {
        Self {
            tcid: tcid.into(),
            cipher: PackCipher::new(key),
            sequence: SESSION_PACK_SEQUENCE,
        }
    }

    /// Override the sequence counter.
    pub fn sequence(mut self, sequence: u32) -> Self {
        self.sequence = sequence;
        self
    }

    /// Encrypt `request` and wrap it.
    ///
    /// # Errors
    /// Returns an error if the request cannot be serialised.
    pub fn build(&self, request: &Request) -> Result<Envelope> {
        let pack = self.cipher.encrypt(request)?;
        Ok(Envelope::device_pack(self.tcid.clone(), self.sequence, pack))
    }
}

/// `{"t":"scan"}`, sent unencrypted.
pub fn scan_request() -> Envelope {
    Envelope::scan()
}

/// `{"t":"bind","mac":<cid>,"uid":0}`, sent unencrypted.
///
/// The device answers with a pack encrypted under the generic key.
pub fn bind_request(cid: &str) -> Envelope {
    Envelope::bind(cid)
}

/// Multi-column status query, encrypted with the session key.
pub fn status_request(cid: &str, key: &SessionKey, cols: &[ParameterName]) -> Result<Envelope> {
    PackBuilder::session(cid, key).build(&Request::status(cid, cols))
}

/// Parameter write, encrypted with the session key.
pub fn command_request(
    cid: &str,
    key: &SessionKey,
    writes: &[(ParameterName, i64)],
) -> Result<Envelope> {
    PackBuilder::session(cid, key).build(&Request::command(writes))
}
