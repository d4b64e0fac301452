//! Outer message envelope.
//!
//! ```text
//! {"t":"scan"}
//! {"t":"bind","mac":"<cid>","uid":0}
//! {"cid":"app","i":0,"pack":"<base64>","t":"pack","tcid":"<cid>","uid":0}
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use airlink_core::constants::{APP_CID, DEFAULT_UID};
use airlink_core::{Error, Result};

/// Known values of the outer `t` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    Scan,
    Bind,
    Pack,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Scan => "scan",
            MessageType::Bind => "bind",
            MessageType::Pack => "pack",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The plain-JSON outer message carried in one datagram.
///
/// Field order matches what devices and the vendor app send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Sender tag (`"app"` for requests, the device cid for replies).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cid: Option<String>,

    /// Sequence counter.
    #[serde(rename = "i", default, skip_serializing_if = "Option::is_none")]
    pub sequence: Option<u32>,

    /// Base64 ciphertext of the inner payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pack: Option<String>,

    /// Message type tag.
    #[serde(rename = "t")]
    pub kind: String,

    /// Device cid in a bind request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mac: Option<String>,

    /// Target device cid.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tcid: Option<String>,

    /// User id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<u32>,
}

impl Envelope {
    /// Bare discovery request.
    pub fn scan() -> Self {
        Self {
            cid: None,
            sequence: None,
            pack: None,
            kind: MessageType::Scan.as_str().to_string(),
            mac: None,
            tcid: None,
            uid: None,
        }
    }

    /// Bare key request for `cid`; sent as plain JSON, never encrypted.
    pub fn bind(cid: impl Into<String>) -> Self {
        Self {
            cid: None,
            sequence: None,
            pack: None,
            kind: MessageType::Bind.as_str().to_string(),
            mac: Some(cid.into()),
            tcid: None,
            uid: Some(DEFAULT_UID),
        }
    }

    /// Device-addressed wrapper around an already encrypted pack.
    pub fn device_pack(tcid: impl Into<String>, sequence: u32, pack: String) -> Self {
        Self {
            cid: Some(APP_CID.to_string()),
            sequence: Some(sequence),
            pack: Some(pack),
            kind: MessageType::Pack.as_str().to_string(),
            mac: None,
            tcid: Some(tcid.into()),
            uid: Some(DEFAULT_UID),
        }
    }

    pub fn is(&self, kind: MessageType) -> bool {
        self.kind == kind.as_str()
    }

    /// The encrypted payload of a `pack` message.
    ///
    /// # Errors
    /// Returns `Error::UnexpectedMessageType` if this is not a `pack`
    /// message, or `Error::MissingField` if the pack is absent.
    pub fn pack_payload(&self) -> Result<&str> {
        if !self.is(MessageType::Pack) {
            return Err(Error::UnexpectedMessageType {
                expected: MessageType::Pack.to_string(),
                actual: self.kind.clone(),
            });
        }
        self.pack
            .as_deref()
            .ok_or_else(|| Error::MissingField("pack".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_serializes_bare() {
        let json = serde_json::to_string(&Envelope::scan()).unwrap();
        assert_eq!(json, r#"{"t":"scan"}"#);
    }

    #[test]
    fn test_bind_serializes_bare() {
        let envelope = Envelope::bind("f4911e7aca7b");
        assert!(envelope.is(MessageType::Bind));
        assert!(envelope.pack.is_none());

        let json = serde_json::to_string(&envelope).unwrap();
        assert_eq!(json, r#"{"t":"bind","mac":"f4911e7aca7b","uid":0}"#);
    }

    #[test]
    fn test_device_pack_serializes_in_order() {
        let envelope = Envelope::device_pack("f4911e7aca7b", 0, "AAAA".to_string());
        let json = serde_json::to_string(&envelope).unwrap();
        assert_eq!(
            json,
            r#"{"cid":"app","i":0,"pack":"AAAA","t":"pack","tcid":"f4911e7aca7b","uid":0}"#
        );
    }

    #[test]
    fn test_parse_device_reply_with_extra_fields() {
        let raw = r#"{"t":"pack","i":1,"uid":0,"cid":"f4911e7aca7b","tcid":"","pack":"QUJD","extra":true}"#;
        let envelope: Envelope = serde_json::from_str(raw).unwrap();

        assert!(envelope.is(MessageType::Pack));
        assert_eq!(envelope.cid.as_deref(), Some("f4911e7aca7b"));
        assert_eq!(envelope.pack_payload().unwrap(), "QUJD");
    }

    #[test]
    fn test_pack_payload_errors() {
        assert!(matches!(
            Envelope::scan().pack_payload(),
            Err(Error::UnexpectedMessageType { .. })
        ));
        assert!(Envelope::bind("x").pack_payload().is_err());

        let mut envelope = Envelope::device_pack("x", 0, String::new());
        envelope.pack = None;
        assert!(matches!(
            envelope.pack_payload(),
            Err(Error::MissingField(_))
        ));
    }
}
