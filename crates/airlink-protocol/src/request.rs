//! Inner request payloads (the plaintext of a pack).

use serde::{Deserialize, Serialize};

use airlink_core::ParameterName;

/// Plaintext payload of a device-addressed request.
///
/// Bind is not here: it travels as a bare [`Envelope`](crate::Envelope).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "lowercase")]
pub enum Request {
    /// `{"t":"status","cols":[...],"mac":<cid>}`
    Status {
        cols: Vec<ParameterName>,
        mac: String,
    },

    /// `{"t":"cmd","opt":[...],"p":[...]}`
    Cmd { opt: Vec<ParameterName>, p: Vec<i64> },
}

impl Request {
    pub fn status(cid: impl Into<String>, cols: &[ParameterName]) -> Self {
        Request::Status {
            cols: cols.to_vec(),
            mac: cid.into(),
        }
    }

    /// Write several parameters at once; `opt` and `p` stay index-aligned.
    pub fn command(writes: &[(ParameterName, i64)]) -> Self {
        let (opt, p) = writes.iter().copied().unzip();
        Request::Cmd { opt, p }
    }
}
