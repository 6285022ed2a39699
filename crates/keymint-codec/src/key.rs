//! Symmetric key material.

use std::fmt;
use std::str::FromStr;

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use rand::RngCore;

use crate::CodecError;

/// Key size for AES-256 (256 bits)
pub const KEY_SIZE: usize = 32;

/// A 256-bit AES key.
///
/// `Debug` never prints the key bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct CodecKey([u8; KEY_SIZE]);

impl CodecKey {
    /// Wraps raw key bytes.
    #[must_use]
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Generates a random key.
    #[must_use]
    pub fn generate() -> Self {
        let mut key = [0u8; KEY_SIZE];
        rand::thread_rng().fill_bytes(&mut key);
        Self(key)
    }

    /// Parses a key from a 64-character hex string or standard base64.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::InvalidKey`] if the input is neither, or does
    /// not decode to exactly 32 bytes.
    pub fn parse(input: &str) -> Result<Self, CodecError> {
        let input = input.trim();

        if input.len() == KEY_SIZE * 2
            && let Ok(bytes) = hex::decode(input)
        {
            return Self::from_slice(&bytes);
        }

        let bytes = BASE64
            .decode(input)
            .map_err(|e| CodecError::invalid_key(format!("expected hex or base64: {e}")))?;
        Self::from_slice(&bytes)
    }

    fn from_slice(bytes: &[u8]) -> Result<Self, CodecError> {
        let key: [u8; KEY_SIZE] = bytes.try_into().map_err(|_| {
            CodecError::invalid_key(format!(
                "key must be {KEY_SIZE} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self(key))
    }

    /// Raw key bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }

    /// Hex encoding of the key, suitable for configuration files.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl FromStr for CodecKey {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Debug for CodecKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CodecKey(..)")
    }
}
