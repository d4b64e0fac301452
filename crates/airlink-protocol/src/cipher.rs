//! AES-128-ECB encryption of pack payloads.
//!
//! Packs are serialised to JSON, padded with [`pad`], encrypted block by
//! block with no IV or chaining, and base64 encoded. Decryption runs the
//! same steps in reverse and fails on malformed base64, a ciphertext that
//! is not block aligned, or plaintext that is not valid JSON (which is what
//! a wrong key produces).
//!
//! # Example
//!
//! ```
//! use airlink_protocol::PackCipher;
//! use serde_json::{json, Value};
//!
//! let cipher = PackCipher::generic();
//! let pack = cipher.encrypt(&json!({"t": "bind", "mac": "f4911e7aca7b", "uid": 0})).unwrap();
//!
//! let decoded: Value = cipher.decrypt(&pack).unwrap();
//! assert_eq!(decoded["t"], "bind");
//! ```

use aes::Aes128;
use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;

use crate::padding::{pad, unpad};
use airlink_core::constants::{BLOCK_SIZE, GENERIC_KEY};
use airlink_core::{Error, Result, SessionKey};

/// Pack encryptor/decryptor bound to one key.
#[derive(Clone)]
pub struct PackCipher {
    cipher: Aes128,
}

impl PackCipher {
    /// Cipher for the negotiated per-device key.
    pub fn new(key: &SessionKey) -> Self {
        Self::from_key(key.as_bytes())
    }

    /// Cipher for the well-known key used during scan and bind.
    pub fn generic() -> Self {
        Self::from_key(GENERIC_KEY)
    }

    fn from_key(key: &[u8; 16]) -> Self {
        Self {
            cipher: Aes128::new(GenericArray::from_slice(key)),
        }
    }

    /// Pad and encrypt raw bytes.
    pub fn encrypt_bytes(&self, plaintext: &[u8]) -> Vec<u8> {
        let mut buffer = pad(plaintext);
        for block in buffer.chunks_exact_mut(BLOCK_SIZE) {
            self.cipher.encrypt_block(GenericArray::from_mut_slice(block));
        }
        buffer
    }

    /// Decrypt raw bytes and strip padding.
    ///
    /// # Errors
    /// Returns `Error::MisalignedCiphertext` if the input is empty or not a
    /// multiple of the block size.
    pub fn decrypt_bytes(&self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        if ciphertext.is_empty() || ciphertext.len() % BLOCK_SIZE != 0 {
            return Err(Error::MisalignedCiphertext(ciphertext.len()));
        }

        let mut buffer = ciphertext.to_vec();
        for block in buffer.chunks_exact_mut(BLOCK_SIZE) {
            self.cipher.decrypt_block(GenericArray::from_mut_slice(block));
        }

        let len = unpad(&buffer).len();
        buffer.truncate(len);
        Ok(buffer)
    }

    /// Serialise `payload` to JSON and encrypt it into a base64 pack.
    pub fn encrypt<T: Serialize>(&self, payload: &T) -> Result<String> {
        let json = serde_json::to_vec(payload)?;
        Ok(STANDARD.encode(self.encrypt_bytes(&json)))
    }

    /// Decrypt a base64 pack and parse the JSON inside.
    ///
    /// # Errors
    /// Returns an error if the pack is not valid base64, is not block
    /// aligned, or does not decrypt to JSON of the expected shape.
    pub fn decrypt<T: DeserializeOwned>(&self, pack: &str) -> Result<T> {
        let ciphertext = STANDARD
            .decode(pack)
            .map_err(|e| Error::InvalidBase64(e.to_string()))?;
        let plaintext = self.decrypt_bytes(&ciphertext)?;
        Ok(serde_json::from_slice(&plaintext)?)
    }
}

impl fmt::Debug for PackCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PackCipher(..)")
    }
}
