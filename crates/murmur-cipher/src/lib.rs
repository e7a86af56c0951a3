//! murmur stream cipher
//!
//! Symmetric obfuscation codec for the murmur chat transport. Payloads are
//! XORed against a repeating key and wrapped in radix-64 so the wire never
//! carries raw control bytes.
//!
//! # Security
//!
//! This is an obfuscation layer, not encryption. A repeating-key XOR is
//! trivially broken with known plaintext and provides no integrity. Nothing
//! here authenticates the peer or detects key mismatch: a receiver with the
//! wrong key sees garbage or falls back to plaintext.
//!
//! # Components
//!
//! - [`Key`]: Non-empty key material, zeroized on drop
//! - [`StreamCipher`]: Shared codec with atomic key rotation
//! - [`Decoded`]: Receive-side result carrying the [`Encoding`] that produced it

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod cipher;
mod error;
mod key;

pub use cipher::{Decoded, Encoding, StreamCipher, xor_with_key};
pub use error::CipherError;
pub use key::{DEFAULT_KEY, GENERATED_KEY_LEN, Key};
