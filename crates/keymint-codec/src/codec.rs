//! Envelope sealing and opening.

use std::fmt;
use std::time::Duration;

use aes_gcm::{
    Aes256Gcm, Key, Nonce,
    aead::{Aead, KeyInit},
};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{CodecError, CodecKey, CodecResult};

/// Nonce size for AES-256-GCM (96 bits)
const NONCE_SIZE: usize = 12;

/// Authentication tag size (128 bits)
const TAG_SIZE: usize = 16;

/// Default validity window of an envelope.
pub const DEFAULT_TTL: Duration = Duration::from_secs(10 * 60);

/// Plaintext carried inside an envelope.
#[derive(Serialize)]
struct Payload<'a> {
    code: &'a str,
    redirect_uri: &'a str,
    /// Unix milliseconds
    issued_at: i64,
}

#[derive(Deserialize)]
struct OwnedPayload {
    code: String,
    redirect_uri: String,
    issued_at: i64,
}

/// The contents of a successfully opened envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedCode {
    pub code: String,
    pub redirect_uri: String,
}

/// Seals and opens authorization code envelopes.
///
/// Encoding always uses the current key. Decoding tries the current key and
/// then each previous key, so keys can be rotated without invalidating
/// envelopes already handed out.
#[derive(Clone)]
pub struct CodeCodec {
    current: Aes256Gcm,
    previous: Vec<Aes256Gcm>,
    ttl: Duration,
}

impl CodeCodec {
    /// Creates a codec sealing under `key` with the default 10-minute window.
    #[must_use]
    pub fn new(key: CodecKey) -> Self {
        Self {
            current: cipher(&key),
            previous: Vec::new(),
            ttl: DEFAULT_TTL,
        }
    }

    /// Adds a retired key that is still accepted when opening envelopes.
    #[must_use]
    pub fn with_previous_key(mut self, key: CodecKey) -> Self {
        self.previous.push(cipher(&key));
        self
    }

    /// Adds several retired keys, tried in order.
    #[must_use]
    pub fn with_previous_keys(mut self, keys: impl IntoIterator<Item = CodecKey>) -> Self {
        self.previous.extend(keys.into_iter().map(|key| cipher(&key)));
        self
    }

    /// Overrides the validity window.
    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// The validity window.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Seals a code issued now.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Encoding`] if serialization or encryption fails.
    pub fn encode(&self, code: &str, redirect_uri: &str) -> CodecResult<String> {
        self.encode_at(code, redirect_uri, OffsetDateTime::now_utc())
    }

    /// Seals a code with an explicit issue time.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Encoding`] if serialization or encryption fails.
    pub fn encode_at(
        &self,
        code: &str,
        redirect_uri: &str,
        issued_at: OffsetDateTime,
    ) -> CodecResult<String> {
        let payload = Payload {
            code,
            redirect_uri,
            issued_at: unix_millis(issued_at),
        };
        let plaintext = serde_json::to_vec(&payload)
            .map_err(|e| CodecError::encoding(format!("payload serialization: {e}")))?;

        let mut nonce_bytes = [0u8; NONCE_SIZE];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);

        let ciphertext = self
            .current
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext.as_slice())
            .map_err(|e| CodecError::encoding(format!("encryption: {e}")))?;

        let mut sealed = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend_from_slice(&ciphertext);

        Ok(URL_SAFE_NO_PAD.encode(sealed))
    }

    /// Opens an envelope against the system clock.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::InvalidOrExpiredCode`] for every kind of failure.
    pub fn decode(&self, envelope: &str) -> CodecResult<DecodedCode> {
        self.decode_at(envelope, OffsetDateTime::now_utc())
    }

    /// Opens an envelope against an explicit clock reading.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::InvalidOrExpiredCode`] for every kind of failure.
    pub fn decode_at(&self, envelope: &str, now: OffsetDateTime) -> CodecResult<DecodedCode> {
        let payload = self.open(envelope).ok_or_else(|| {
            tracing::debug!("rejected code envelope");
            CodecError::InvalidOrExpiredCode
        })?;

        let age_ms = i128::from(unix_millis(now)) - i128::from(payload.issued_at);
        if age_ms > self.ttl.as_millis() as i128 {
            tracing::debug!("rejected code envelope");
            return Err(CodecError::InvalidOrExpiredCode);
        }

        Ok(DecodedCode {
            code: payload.code,
            redirect_uri: payload.redirect_uri,
        })
    }

    fn open(&self, envelope: &str) -> Option<OwnedPayload> {
        let sealed = URL_SAFE_NO_PAD.decode(envelope).ok()?;
        if sealed.len() < NONCE_SIZE + TAG_SIZE {
            return None;
        }
        let (nonce, ciphertext) = sealed.split_at(NONCE_SIZE);
        let nonce = Nonce::from_slice(nonce);

        let plaintext = std::iter::once(&self.current)
            .chain(&self.previous)
            .find_map(|cipher| cipher.decrypt(nonce, ciphertext).ok())?;

        serde_json::from_slice(&plaintext).ok()
    }
}

impl fmt::Debug for CodeCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodeCodec")
            .field("previous_keys", &self.previous.len())
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

fn cipher(key: &CodecKey) -> Aes256Gcm {
    Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes()))
}

fn unix_millis(at: OffsetDateTime) -> i64 {
    (at.unix_timestamp_nanos() / 1_000_000) as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> CodeCodec {
        CodeCodec::new(CodecKey::from_bytes([42u8; 32]))
    }

    #[test]
    fn test_envelope_layout() {
        let envelope = codec()
            .encode_at("c", "https://cb", OffsetDateTime::UNIX_EPOCH)
            .unwrap();
        let raw = URL_SAFE_NO_PAD.decode(&envelope).unwrap();
        let payload_len = serde_json::to_vec(&Payload {
            code: "c",
            redirect_uri: "https://cb",
            issued_at: 0,
        })
        .unwrap()
        .len();

        assert_eq!(raw.len(), NONCE_SIZE + payload_len + TAG_SIZE);
    }

    #[test]
    fn test_short_input_rejected() {
        let short = URL_SAFE_NO_PAD.encode([0u8; NONCE_SIZE + TAG_SIZE - 1]);
        assert!(codec().decode(&short).unwrap_err().is_invalid_code());
    }

    #[test]
    fn test_non_json_plaintext_rejected() {
        let codec = codec();
        let nonce = [1u8; NONCE_SIZE];
        let ciphertext = codec
            .current
            .encrypt(Nonce::from_slice(&nonce), b"not json".as_slice())
            .unwrap();
        let mut sealed = nonce.to_vec();
        sealed.extend(ciphertext);

        let err = codec.decode(&URL_SAFE_NO_PAD.encode(sealed)).unwrap_err();
        assert_eq!(err, CodecError::InvalidOrExpiredCode);
    }

    #[test]
    fn test_debug_omits_keys() {
        let rendered = format!("{:?}", codec().with_previous_key(CodecKey::generate()));
        assert!(rendered.contains("previous_keys: 1"));
    }
}
