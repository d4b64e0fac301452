//! Shared fixtures for protocol integration tests.
//!
//! The helpers play the device side of an exchange: they build the reply
//! envelopes a real unit would send so tests can feed them to the parsers.

#![allow(dead_code)]

use airlink_core::SessionKey;
use airlink_protocol::{Envelope, PackCipher};
use serde_json::{Value, json};

pub const TEST_CID: &str = "f4911e7aca7b";
pub const TEST_KEY: &str = "Ab1Cd2Ef3Gh4Ij5K";

pub fn session_key() -> SessionKey {
    TEST_KEY.parse().unwrap()
}

/// Reply envelope as sent by the device, with `payload` encrypted under `cipher`.
pub fn device_reply(cipher: &PackCipher, payload: Value) -> Envelope {
    let mut envelope = Envelope::device_pack("", 0, cipher.encrypt(&payload).unwrap());
    envelope.cid = Some(TEST_CID.to_string());
    envelope
}

pub fn scan_reply() -> Envelope {
    device_reply(
        &PackCipher::generic(),
        json!({"t": "dev", "cid": TEST_CID, "mac": TEST_CID, "name": "living room", "ver": "V1.1.13"}),
    )
}

pub fn bind_reply() -> Envelope {
    device_reply(
        &PackCipher::generic(),
        json!({"t": "bindok", "mac": TEST_CID, "key": TEST_KEY}),
    )
}

pub fn status_reply(cols: &[&str], dat: &[i64]) -> Envelope {
    device_reply(
        &PackCipher::new(&session_key()),
        json!({"t": "dat", "mac": TEST_CID, "cols": cols, "dat": dat}),
    )
}

pub fn command_reply(code: i64) -> Envelope {
    device_reply(
        &PackCipher::new(&session_key()),
        json!({"t": "res", "mac": TEST_CID, "r": code, "opt": ["Pow"], "p": [1]}),
    )
}
