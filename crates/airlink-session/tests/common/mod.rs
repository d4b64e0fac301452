//! Scripted fake air conditioner for session tests.
//!
//! [`FakeDevice`] implements `Transport` entirely in memory. It answers
//! scans, binds, status polls and commands the way a real unit does, and
//! can be told to stay silent or misbehave for a number of requests of a
//! given kind. Silence is modelled as sleeping for the response timeout and
//! returning `None`, so tests should run with paused time.

#![allow(dead_code)]

use airlink_core::SessionKey;
use airlink_network::{Transport, TransportError};
use airlink_protocol::{Envelope, MessageType, PackCipher};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const CID: &str = "f4911e7aca7b";
pub const KEY: &str = "Ab1Cd2Ef3Gh4Ij5K";
pub const TICK: Duration = Duration::from_millis(100);
pub const RESPONSE_TIMEOUT: Duration = Duration::from_millis(2000);

pub fn device_addr() -> SocketAddr {
    "192.168.1.50:7000".parse().unwrap()
}

/// What the device was asked, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Scan,
    Bind,
    Status,
    Command,
    Unknown,
}

/// How the device answers the next request of some kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// No reply until the timeout
    Silent,
    /// Reply that cannot be decrypted
    Garbage,
    /// Bind reply without a key
    MissingKey,
    /// Command result with a non-200 code
    Reject,
}

#[derive(Debug, Default)]
struct DeviceState {
    values: BTreeMap<String, i64>,
    faults: Vec<(RequestKind, Fault, usize)>,
    requests: Vec<RequestKind>,
    commands: Vec<Value>,
}

#[derive(Debug, Clone)]
pub struct FakeDevice {
    state: Arc<Mutex<DeviceState>>,
}

impl FakeDevice {
    pub fn new() -> Self {
        let values = [
            ("Pow", 1),
            ("Lig", 1),
            ("SetTem", 24),
            ("Tur", 0),
            ("TemSen", 66),
            ("Blo", 0),
            ("Quiet", 0),
            ("SwhSlp", 0),
            ("WdSpd", 2),
            ("Mod", 1),
            ("SwUpDn", 0),
        ]
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect();

        Self {
            state: Arc::new(Mutex::new(DeviceState {
                values,
                ..Default::default()
            })),
        }
    }

    /// Misbehave for the next `times` requests of `kind`.
    pub fn fault(&self, kind: RequestKind, fault: Fault, times: usize) -> &Self {
        self.state.lock().unwrap().faults.push((kind, fault, times));
        self
    }

    pub fn requests(&self) -> Vec<RequestKind> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn count(&self, kind: RequestKind) -> usize {
        self.requests().into_iter().filter(|k| *k == kind).count()
    }

    /// Inner payloads of every command received, including failed ones.
    pub fn commands(&self) -> Vec<Value> {
        self.state.lock().unwrap().commands.clone()
    }

    pub fn value(&self, name: &str) -> Option<i64> {
        self.state.lock().unwrap().values.get(name).copied()
    }

    fn session_key() -> SessionKey {
        KEY.parse().unwrap()
    }

    fn classify(request: &Envelope) -> (RequestKind, Value) {
        if request.is(MessageType::Scan) {
            return (RequestKind::Scan, Value::Null);
        }
        if request.is(MessageType::Bind) {
            // Bind is the only plain request that names the device.
            let kind = if request.mac.as_deref() == Some(CID) && request.uid == Some(0) {
                RequestKind::Bind
            } else {
                RequestKind::Unknown
            };
            return (kind, Value::Null);
        }
        let Ok(pack) = request.pack_payload() else {
            return (RequestKind::Unknown, Value::Null);
        };

        let inner: Value = PackCipher::new(&Self::session_key())
            .decrypt(pack)
            .unwrap_or(Value::Null);

        let kind = match inner["t"].as_str() {
            Some("status") => RequestKind::Status,
            Some("cmd") => RequestKind::Command,
            _ => RequestKind::Unknown,
        };
        (kind, inner)
    }

    fn take_fault(state: &mut DeviceState, kind: RequestKind) -> Option<Fault> {
        let slot = state
            .faults
            .iter_mut()
            .find(|(k, _, remaining)| *k == kind && *remaining > 0)?;
        slot.2 -= 1;
        Some(slot.1)
    }

    fn reply(cipher: &PackCipher, payload: Value) -> Envelope {
        let mut envelope = Envelope::device_pack("", 0, cipher.encrypt(&payload).unwrap());
        envelope.cid = Some(CID.to_string());
        envelope
    }

    fn garbage() -> Envelope {
        let mut envelope = Envelope::device_pack("", 0, "AAAAAAAAAAAAAAAAAAAAAA==".to_string());
        envelope.cid = Some(CID.to_string());
        envelope
    }

    /// Decide the reply synchronously; `None` means stay silent.
    fn respond(&self, request: &Envelope) -> Option<Envelope> {
        let (kind, inner) = Self::classify(request);
        let mut state = self.state.lock().unwrap();
        state.requests.push(kind);
        if kind == RequestKind::Command {
            state.commands.push(inner.clone());
        }

        let fault = Self::take_fault(&mut state, kind);
        match fault {
            Some(Fault::Silent) => return None,
            Some(Fault::Garbage) => return Some(Self::garbage()),
            _ => {}
        }

        let session = PackCipher::new(&Self::session_key());
        match kind {
            RequestKind::Scan => Some(Self::reply(
                &PackCipher::generic(),
                json!({"t": "dev", "cid": CID, "mac": CID, "name": "bedroom", "ver": "V1.1.13"}),
            )),
            RequestKind::Bind if fault == Some(Fault::MissingKey) => Some(Self::reply(
                &PackCipher::generic(),
                json!({"t": "bindok", "mac": CID}),
            )),
            RequestKind::Bind => Some(Self::reply(
                &PackCipher::generic(),
                json!({"t": "bindok", "mac": CID, "key": KEY}),
            )),
            RequestKind::Status => {
                let cols: Vec<String> = inner["cols"]
                    .as_array()
                    .map(|cols| {
                        cols.iter()
                            .filter_map(|c| c.as_str().map(str::to_string))
                            .collect()
                    })
                    .unwrap_or_default();
                let dat: Vec<i64> = cols
                    .iter()
                    .map(|c| state.values.get(c).copied().unwrap_or(0))
                    .collect();
                Some(Self::reply(
                    &session,
                    json!({"t": "dat", "mac": CID, "r": 200, "cols": cols, "dat": dat}),
                ))
            }
            RequestKind::Command if fault == Some(Fault::Reject) => Some(Self::reply(
                &session,
                json!({"t": "res", "mac": CID, "r": 400}),
            )),
            RequestKind::Command => {
                let opt = inner["opt"].as_array().cloned().unwrap_or_default();
                let p = inner["p"].as_array().cloned().unwrap_or_default();
                for (name, value) in opt.iter().zip(&p) {
                    if let (Some(name), Some(value)) = (name.as_str(), value.as_i64()) {
                        state.values.insert(name.to_string(), value);
                    }
                }
                Some(Self::reply(
                    &session,
                    json!({"t": "res", "mac": CID, "r": 200, "opt": opt, "p": p}),
                ))
            }
            RequestKind::Unknown => None,
        }
    }
}

impl Transport for FakeDevice {
    fn send(
        &self,
        request: Envelope,
        _addr: SocketAddr,
    ) -> impl Future<Output = Result<Option<Envelope>, TransportError>> + Send {
        let reply = self.respond(&request);
        async move {
            match reply {
                Some(reply) => Ok(Some(reply)),
                None => {
                    tokio::time::sleep(RESPONSE_TIMEOUT).await;
                    Ok(None)
                }
            }
        }
    }
}
