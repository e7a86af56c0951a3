//! Keyed XOR transform with radix-64 transport wrapping.
//!
//! # Wire format
//!
//! ```text
//! utf8(message) ──XOR key[i mod len]──> obfuscated bytes ──radix-64──> wire
//! ```
//!
//! The transform is self-inverse and stateless per call: every encode and
//! decode starts at key offset zero. There is no framing; a receiver passes
//! whatever a single read returned to [`StreamCipher::decode_with_fallback`].

use std::{
    fmt,
    sync::{Arc, PoisonError, RwLock},
};

use base64::{Engine as _, engine::general_purpose::STANDARD};

use crate::{CipherError, Key};

/// XOR `data` against `key` repeated cyclically.
///
/// Applying this twice with the same key returns the original bytes.
/// An empty key leaves `data` unchanged; [`Key`] never hands one out.
pub fn xor_with_key(data: &[u8], key: &[u8]) -> Vec<u8> {
    if key.is_empty() {
        return data.to_vec();
    }
    data.iter().zip(key.iter().cycle()).map(|(byte, k)| byte ^ k).collect()
}

/// How a received chunk was turned into text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// Radix-64 + XOR decode succeeded with the current key.
    Cipher,
    /// Cipher path failed; the raw bytes were valid UTF-8.
    Plaintext,
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cipher => write!(f, "cipher"),
            Self::Plaintext => write!(f, "plain"),
        }
    }
}

/// Result of the receive-side decode policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    /// Recovered text.
    pub text: String,
    /// Which path produced `text`.
    pub encoding: Encoding,
}

/// Keyed XOR + radix-64 codec.
///
/// Shared between the caller (encode on send) and the endpoint worker
/// (decode on receive), typically behind an `Arc`. Each call takes one
/// snapshot of the key, so a concurrent [`StreamCipher::set_key`] is observed
/// either fully or not at all.
pub struct StreamCipher {
    key: RwLock<Arc<Key>>,
}

impl StreamCipher {
    /// Create a cipher with the given key.
    pub fn new(key: Key) -> Self {
        Self { key: RwLock::new(Arc::new(key)) }
    }

    /// Replace the key.
    ///
    /// Calls already in progress finish with the key they started with.
    pub fn set_key(&self, key: Key) {
        let mut slot = self.key.write().unwrap_or_else(PoisonError::into_inner);
        *slot = Arc::new(key);
    }

    /// Masked form of the current key, for logs and status lines.
    pub fn masked_key(&self) -> String {
        self.snapshot().masked()
    }

    /// Encode text for the wire: `radix64(xor(utf8(plaintext)))`.
    ///
    /// Deterministic. The empty string encodes to an empty buffer.
    pub fn encode(&self, plaintext: &str) -> Vec<u8> {
        let key = self.snapshot();
        let obfuscated = xor_with_key(plaintext.as_bytes(), key.as_bytes());
        STANDARD.encode(obfuscated).into_bytes()
    }

    /// Reverse [`StreamCipher::encode`].
    ///
    /// # Errors
    ///
    /// - `CipherError::Radix64` if `transport` is not valid radix-64
    /// - `CipherError::InvalidUtf8` if the XOR output is not UTF-8
    pub fn decode(&self, transport: &[u8]) -> Result<String, CipherError> {
        let obfuscated =
            STANDARD.decode(transport).map_err(|e| CipherError::Radix64(e.to_string()))?;

        let key = self.snapshot();
        let plain = xor_with_key(&obfuscated, key.as_bytes());
        String::from_utf8(plain).map_err(|_| CipherError::InvalidUtf8)
    }

    /// Raw XOR stage without radix-64 wrapping.
    pub fn apply_keystream(&self, data: &[u8]) -> Vec<u8> {
        let key = self.snapshot();
        xor_with_key(data, key.as_bytes())
    }

    /// Decode a received chunk, falling back to plaintext.
    ///
    /// Peers that send unencrypted text are still understood: if the cipher
    /// path fails, the raw bytes are reinterpreted as UTF-8.
    ///
    /// # Errors
    ///
    /// - `CipherError::Undecodable` if both paths fail
    pub fn decode_with_fallback(&self, data: &[u8]) -> Result<Decoded, CipherError> {
        if let Ok(text) = self.decode(data) {
            return Ok(Decoded { text, encoding: Encoding::Cipher });
        }

        match std::str::from_utf8(data) {
            Ok(text) => Ok(Decoded { text: text.to_string(), encoding: Encoding::Plaintext }),
            Err(_) => Err(CipherError::Undecodable { len: data.len() }),
        }
    }

    fn snapshot(&self) -> Arc<Key> {
        Arc::clone(&self.key.read().unwrap_or_else(PoisonError::into_inner))
    }
}

impl Default for StreamCipher {
    fn default() -> Self {
        Self::new(Key::default())
    }
}

impl fmt::Debug for StreamCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamCipher").field("key", &self.masked_key()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cipher(key: &str) -> StreamCipher {
        StreamCipher::new(Key::new(key).unwrap())
    }

    #[test]
    fn encode_matches_known_vector() {
        assert_eq!(cipher("key1").encode("hello"), b"AwAVXQQ=");
        assert_eq!(cipher("key1").encode("héllo ✓"), b"A6bQXQcKWdP39g==");
    }

    #[test]
    fn empty_string_encodes_to_nothing() {
        let c = cipher("k");
        assert!(c.encode("").is_empty());
        assert_eq!(c.decode(b"").unwrap(), "");
    }

    #[test]
    fn decode_known_vector() {
        assert_eq!(cipher("key1").decode(b"AwAVXQQ=").unwrap(), "hello");
    }

    #[test]
    fn decode_rejects_bad_radix64() {
        let err = cipher("key1").decode(b"not radix64!").unwrap_err();
        assert!(matches!(err, CipherError::Radix64(_)));
    }

    #[test]
    fn decode_rejects_invalid_utf8() {
        // 0x94 ^ 'k' = 0xff, never valid UTF-8
        assert_eq!(cipher("k").decode(b"lA=="), Err(CipherError::InvalidUtf8));
    }

    #[test]
    fn fallback_accepts_plaintext_peer() {
        let decoded = cipher("key1").decode_with_fallback(b"hi there").unwrap();
        assert_eq!(decoded, Decoded { text: "hi there".to_string(), encoding: Encoding::Plaintext });
    }

    #[test]
    fn fallback_delivers_raw_text_when_xor_output_is_not_utf8() {
        let decoded = cipher("k").decode_with_fallback(b"lA==").unwrap();
        assert_eq!(decoded.text, "lA==");
        assert_eq!(decoded.encoding, Encoding::Plaintext);
    }

    #[test]
    fn fallback_reports_garbage() {
        let err = cipher("k").decode_with_fallback(&[0xff, 0xfe, 0x00]).unwrap_err();
        assert_eq!(err, CipherError::Undecodable { len: 3 });
    }

    #[test]
    fn set_key_changes_output() {
        let c = cipher("key1");
        let before = c.encode("hello");
        c.set_key(Key::new("key2").unwrap());
        assert_ne!(c.encode("hello"), before);
        assert_eq!(c.decode(&c.encode("hello")).unwrap(), "hello");
    }

    #[test]
    fn keystream_is_self_inverse() {
        let c = cipher("abc");
        let data = b"\x00\x01binary\xff";
        assert_eq!(c.apply_keystream(&c.apply_keystream(data)), data);
    }

    #[test]
    fn xor_with_empty_key_is_identity() {
        assert_eq!(xor_with_key(b"abc", b""), b"abc");
    }

    #[test]
    fn debug_masks_key() {
        let debug = format!("{:?}", cipher("topsecretkey"));
        assert!(!debug.contains("topsecretkey"));
    }

    #[test]
    fn concurrent_rotation_never_mixes_keys() {
        let c = Arc::new(cipher("aaaaaaaa"));
        let writer = {
            let c = Arc::clone(&c);
            std::thread::spawn(move || {
                for i in 0..500 {
                    let key = if i % 2 == 0 { "bbbbbbbb" } else { "aaaaaaaa" };
                    c.set_key(Key::new(key).unwrap());
                }
            })
        };

        let plain = "\0\0\0\0\0\0\0\0";
        for _ in 0..500 {
            // XOR of NULs yields the key itself; a torn key would mix letters
            let raw = STANDARD.decode(c.encode(plain)).unwrap();
            assert!(raw == b"aaaaaaaa" || raw == b"bbbbbbbb");
        }

        writer.join().unwrap();
    }
}
