use crate::{Result, constants::KEY_LENGTH, error::Error};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;
use subtle::ConstantTimeEq;

/// A device found by a scan: where it lives and how to address it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceIdentity {
    /// Address the scan was answered from.
    pub address: SocketAddr,

    /// Correlation id used as `mac`/`tcid` in every later request.
    pub cid: String,

    /// Hardware address, when the device reports one.
    pub mac: Option<String>,

    /// Friendly name configured on the device.
    pub name: Option<String>,
}

impl DeviceIdentity {
    /// Create an identity with only the mandatory fields.
    ///
    /// # Errors
    /// Returns `Error::MissingField` if `cid` is empty.
    pub fn new(address: SocketAddr, cid: impl Into<String>) -> Result<Self> {
        let cid = cid.into();
        if cid.is_empty() {
            return Err(Error::MissingField("cid".to_string()));
        }
        Ok(Self {
            address,
            cid,
            mac: None,
            name: None,
        })
    }

    #[must_use]
    pub fn with_mac(mut self, mac: Option<String>) -> Self {
        self.mac = mac;
        self
    }

    #[must_use]
    pub fn with_name(mut self, name: Option<String>) -> Self {
        self.name = name;
        self
    }
}

impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{} ({}@{})", name, self.cid, self.address),
            None => write!(f, "{}@{}", self.cid, self.address),
        }
    }
}

/// Per-device AES key handed out by the bind reply.
///
/// # Security
/// Comparison is constant-time and `Debug` never prints the key bytes.
#[derive(Clone, Eq)]
pub struct SessionKey([u8; KEY_LENGTH]);

impl SessionKey {
    /// Build a key from raw bytes.
    #[must_use]
    pub fn from_bytes(bytes: [u8; KEY_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Get the raw key bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; KEY_LENGTH] {
        &self.0
    }
}

impl PartialEq for SessionKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.ct_eq(&other.0).into()
    }
}

impl fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("SessionKey(..)")
    }
}

impl std::str::FromStr for SessionKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let bytes: [u8; KEY_LENGTH] = s.as_bytes().try_into().map_err(|_| {
            Error::InvalidKey(format!(
                "Session key must be {KEY_LENGTH} bytes, got {}",
                s.len()
            ))
        })?;
        Ok(Self(bytes))
    }
}
