//! Block padding for pack payloads.
//!
//! Every padding byte carries the number of bytes added, and at least one
//! byte is always added: a block-aligned input gets a full extra block.
//!
//! ```
//! use airlink_protocol::{pad, unpad};
//!
//! let padded = pad(b"{\"t\":\"scan\"}");
//! assert_eq!(padded.len(), 16);
//! assert_eq!(&padded[12..], &[4, 4, 4, 4]);
//! assert_eq!(unpad(&padded), b"{\"t\":\"scan\"}");
//! ```

use airlink_core::constants::BLOCK_SIZE;

/// Pad `data` to a multiple of [`BLOCK_SIZE`].
pub fn pad(data: &[u8]) -> Vec<u8> {
    let padding = BLOCK_SIZE - (data.len() % BLOCK_SIZE);
    let mut padded = Vec::with_capacity(data.len() + padding);
    padded.extend_from_slice(data);
    // padding is 1..=16, fits a byte
    padded.resize(data.len() + padding, padding as u8);
    padded
}

/// Strip padding added by [`pad`].
///
/// If the trailing byte cannot be a padding length (zero, larger than a
/// block, or larger than the input) the input is returned unchanged.
pub fn unpad(data: &[u8]) -> &[u8] {
    let Some(&last) = data.last() else {
        return data;
    };

    let padding = usize::from(last);
    if padding == 0 || padding > BLOCK_SIZE || padding > data.len() {
        return data;
    }

    &data[..data.len() - padding]
}
