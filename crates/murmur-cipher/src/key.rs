//! Cipher key material.
//!
//! A [`Key`] is the UTF-8 encoding of a user-supplied string. It has no
//! identity beyond the connection it is used on and is wiped from memory
//! when dropped.

use std::{fmt, str::FromStr};

use rand::seq::SliceRandom;
use zeroize::Zeroize;

use crate::CipherError;

/// Key used when the key entry surface supplies a blank string.
pub const DEFAULT_KEY: &str = "default_key_123";

/// Length of keys produced by [`Key::generate`].
pub const GENERATED_KEY_LEN: usize = 16;

/// Characters [`Key::generate`] draws from.
const GENERATED_KEY_ALPHABET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789_-";

/// Keys at or below this many characters are fully masked.
const MASK_REVEAL_THRESHOLD: usize = 6;

/// Non-empty XOR key.
///
/// `Debug` prints the masked form so keys never end up in logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Key {
    text: String,
}

impl Key {
    /// Build a key from a UTF-8 string.
    ///
    /// # Errors
    ///
    /// - `CipherError::EmptyKey` if `key` is empty
    pub fn new(key: &str) -> Result<Self, CipherError> {
        if key.is_empty() {
            return Err(CipherError::EmptyKey);
        }
        Ok(Self { text: key.to_string() })
    }

    /// Key from raw user input.
    ///
    /// Surrounding whitespace is trimmed; blank input falls back to
    /// [`DEFAULT_KEY`].
    pub fn from_input(input: &str) -> Self {
        match Self::new(input.trim()) {
            Ok(key) => key,
            Err(_) => Self::default(),
        }
    }

    /// Random 16-character key over `[A-Za-z0-9_-]`.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let text = (0..GENERATED_KEY_LEN)
            .filter_map(|_| GENERATED_KEY_ALPHABET.choose(&mut rng).map(|&b| char::from(b)))
            .collect();
        Self { text }
    }

    /// Key bytes, repeated cyclically by the cipher.
    pub fn as_bytes(&self) -> &[u8] {
        self.text.as_bytes()
    }

    /// Display-safe form of the key.
    ///
    /// Keys longer than six characters keep their first and last three
    /// characters; shorter keys are fully starred.
    pub fn masked(&self) -> String {
        let chars: Vec<char> = self.text.chars().collect();
        if chars.len() <= MASK_REVEAL_THRESHOLD {
            return "*".repeat(chars.len());
        }

        let head: String = chars[..3].iter().collect();
        let tail: String = chars[chars.len() - 3..].iter().collect();
        format!("{head}{}{tail}", "*".repeat(chars.len() - MASK_REVEAL_THRESHOLD))
    }
}

impl Default for Key {
    fn default() -> Self {
        Self { text: DEFAULT_KEY.to_string() }
    }
}

impl FromStr for Key {
    type Err = CipherError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Key").field(&self.masked()).finish()
    }
}

// Wipe key material when the key is rotated out or the cipher is dropped
impl Drop for Key {
    fn drop(&mut self) {
        self.text.zeroize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_key_rejected() {
        assert_eq!(Key::new(""), Err(CipherError::EmptyKey));
    }

    #[test]
    fn blank_input_falls_back_to_default() {
        assert_eq!(Key::from_input("   "), Key::default());
        assert_eq!(Key::from_input("").as_bytes(), DEFAULT_KEY.as_bytes());
        assert_eq!(Key::from_input("  abc  ").as_bytes(), b"abc");
    }

    #[test]
    fn masked_keeps_ends_of_long_keys() {
        let key = Key::new("supersecret").unwrap();
        assert_eq!(key.masked(), "sup*****ret");
    }

    #[test]
    fn masked_hides_short_keys_entirely() {
        assert_eq!(Key::new("key1").unwrap().masked(), "****");
        assert_eq!(Key::new("sixsix").unwrap().masked(), "******");
    }

    #[test]
    fn debug_never_prints_raw_key() {
        let key = Key::new("hunter2hunter2").unwrap();
        let debug = format!("{key:?}");
        assert!(!debug.contains("hunter2hunter2"));
        assert!(debug.contains("hun********er2"));
    }

    #[test]
    fn generated_keys_use_alphabet() {
        let key = Key::generate();
        assert_eq!(key.as_bytes().len(), GENERATED_KEY_LEN);
        assert!(key.as_bytes().iter().all(|b| GENERATED_KEY_ALPHABET.contains(b)));
    }

    #[test]
    fn generated_keys_differ() {
        assert_ne!(Key::generate(), Key::generate());
    }

    #[test]
    fn key_parses_from_str() {
        let key: Key = "key1".parse().unwrap();
        assert_eq!(key.as_bytes(), b"key1");
        assert!("".parse::<Key>().is_err());
    }
}
