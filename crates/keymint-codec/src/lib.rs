//! Stateless authorization code envelopes.
//!
//! A [`CodeCodec`] seals a `(code, redirect_uri, issued_at)` triple into an
//! opaque, URL-safe string using AES-256-GCM and opens it again, rejecting
//! envelopes that are tampered with, sealed under an unknown key, or older
//! than the validity window (10 minutes by default).
//!
//! Wire format: `base64url(nonce[12] || ciphertext || tag[16])`, unpadded.
//!
//! # Example
//!
//! ```
//! use keymint_codec::{CodeCodec, CodecKey};
//!
//! let codec = CodeCodec::new(CodecKey::generate());
//! let envelope = codec.encode("abc", "https://app/cb").unwrap();
//! let decoded = codec.decode(&envelope).unwrap();
//! assert_eq!(decoded.code, "abc");
//! ```

mod codec;
mod error;
mod key;

pub use codec::{CodeCodec, DEFAULT_TTL, DecodedCode};
pub use error::{CodecError, CodecResult};
pub use key::{CodecKey, KEY_SIZE};
