//! Core constants for the air-conditioner LAN protocol.
//!
//! The protocol exchanges JSON objects over UDP. Discovery is a bare
//! `{"t":"scan"}` datagram; everything after it is wrapped in a `pack`
//! envelope whose payload is AES-128-ECB encrypted and base64 encoded:
//!
//! ```text
//! {"cid":"app","i":<seq>,"pack":"<base64>","t":"pack","tcid":"<cid>","uid":0}
//! ```
//!
//! The payload is encrypted with [`GENERIC_KEY`] until the device hands out
//! its own key in the bind reply.
//!
//! # Usage
//!
//! ```
//! use airlink_core::constants::*;
//! use std::time::Duration;
//!
//! assert_eq!(DEFAULT_PORT, 7000);
//! let timeout = Duration::from_millis(DEFAULT_RESPONSE_TIMEOUT_MS);
//! assert_eq!(timeout.as_secs(), 2);
//! ```

// ============================================================================
// Network
// ============================================================================

/// UDP port the device listens on.
pub const DEFAULT_PORT: u16 = 7000;

/// How long a single exchange waits for the reply datagram (milliseconds).
pub const DEFAULT_RESPONSE_TIMEOUT_MS: u64 = 2000;

/// Delay before a failed scan, bind or finished poll is retried (milliseconds).
pub const DEFAULT_RETRY_DELAY_MS: u64 = 2000;

/// Interval of the periodic tick driving a device session (milliseconds).
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 100;

/// Largest datagram accepted from a device.
///
/// Status replies for the full column set stay well under 1 KB.
pub const MAX_DATAGRAM_SIZE: usize = 2048;

// ============================================================================
// Encryption
// ============================================================================

/// Well-known key shared by every device, used for scan and bind only.
pub const GENERIC_KEY: &[u8; 16] = b"a3K8Bx%2r8Y7#xDh";

/// Cipher block size in bytes (AES-128).
pub const BLOCK_SIZE: usize = 16;

/// Length of a negotiated session key in bytes.
pub const KEY_LENGTH: usize = 16;

// ============================================================================
// Envelope values
// ============================================================================

/// Sender tag the app puts in the outer `cid` field.
pub const APP_CID: &str = "app";

/// User id used for every request.
pub const DEFAULT_UID: u32 = 0;

/// Sequence value marking a pack encrypted with the session key.
pub const SESSION_PACK_SEQUENCE: u32 = 0;

/// Status code a device reports for an accepted command.
pub const COMMAND_OK: i64 = 200;

/// Offset subtracted from the raw `TemSen` reading to get degrees Celsius.
pub const SENSOR_TEMPERATURE_OFFSET: i64 = 40;

// ============================================================================
// Events
// ============================================================================

/// Name of the event published after every successful status poll.
pub const PARAMS_EVENT: &str = "params";
