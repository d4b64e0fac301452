//! Inner reply payloads sent back by the device.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::net::SocketAddr;

use airlink_core::constants::COMMAND_OK;
use airlink_core::{DeviceIdentity, Error, ParameterName, ParameterSet, Result, SessionKey};

/// Scan reply (`"t":"dev"`), encrypted with the generic key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanReply {
    #[serde(rename = "t", default)]
    pub kind: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cid: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mac: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Firmware version string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ver: Option<String>,
}

impl ScanReply {
    /// Build the identity of the device that answered from `address`.
    ///
    /// Falls back to `mac` when the reply carries an empty or missing `cid`.
    ///
    /// # Errors
    /// Returns `Error::MissingField` if neither `cid` nor `mac` is present.
    pub fn into_identity(self, address: SocketAddr) -> Result<DeviceIdentity> {
        let cid = self
            .cid
            .filter(|cid| !cid.is_empty())
            .or_else(|| self.mac.clone())
            .ok_or_else(|| Error::MissingField("cid".to_string()))?;

        Ok(DeviceIdentity::new(address, cid)?
            .with_mac(self.mac)
            .with_name(self.name))
    }
}

/// Bind reply (`"t":"bindok"`), encrypted with the generic key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindReply {
    #[serde(rename = "t", default)]
    pub kind: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mac: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

impl BindReply {
    /// The session key handed out by the device.
    ///
    /// # Errors
    /// Returns `Error::MissingField` when the reply has no key and
    /// `Error::InvalidKey` when it is not 16 bytes.
    pub fn session_key(&self) -> Result<SessionKey> {
        self.key
            .as_deref()
            .ok_or_else(|| Error::MissingField("key".to_string()))?
            .parse()
    }
}

/// Status reply (`"t":"dat"`) with parallel `cols`/`dat` arrays.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusReply {
    #[serde(rename = "t", default)]
    pub kind: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mac: Option<String>,

    pub cols: Vec<String>,

    pub dat: Vec<Value>,
}

impl StatusReply {
    /// Decode the columns into a parameter snapshot.
    ///
    /// Columns outside the known vocabulary are skipped.
    ///
    /// # Errors
    /// Returns `Error::MalformedStatus` if a known column has no value or a
    /// value that is not an integer.
    pub fn to_parameter_set(&self, received_at: DateTime<Utc>) -> Result<ParameterSet> {
        let mut raw = Vec::with_capacity(self.cols.len());

        for (index, column) in self.cols.iter().enumerate() {
            let Some(name) = ParameterName::from_wire(column) else {
                continue;
            };

            let value = self.dat.get(index).ok_or_else(|| {
                Error::MalformedStatus(format!("no value for column {column}"))
            })?;
            let value = value.as_i64().ok_or_else(|| {
                Error::MalformedStatus(format!("value {value} for column {column} is not an integer"))
            })?;

            raw.push((name, value));
        }

        Ok(ParameterSet::from_raw(raw, received_at))
    }
}

/// Command result (`"t":"res"`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandReply {
    #[serde(rename = "t", default)]
    pub kind: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mac: Option<String>,

    /// Result code; 200 means accepted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub r: Option<i64>,

    #[serde(default)]
    pub opt: Vec<String>,

    #[serde(default)]
    pub p: Vec<Value>,

    /// Some firmware echoes applied values here instead of `p`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub val: Vec<Value>,
}

impl CommandReply {
    /// Check the device accepted the command.
    ///
    /// A reply without a result code counts as accepted.
    ///
    /// # Errors
    /// Returns `Error::CommandRejected` for any code other than 200.
    pub fn check(&self) -> Result<()> {
        match self.r {
            Some(code) if code != COMMAND_OK => Err(Error::CommandRejected(code)),
            _ => Ok(()),
        }
    }
}
