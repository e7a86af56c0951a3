//! Cipher error types.

use thiserror::Error;

/// Errors produced by key construction and the receive-side codec.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CipherError {
    /// Key string was empty.
    ///
    /// XOR against an empty key is undefined (the cyclic index would divide
    /// by zero), so empty keys are rejected at construction.
    #[error("key must not be empty")]
    EmptyKey,

    /// The radix-64 stage could not be reversed.
    #[error("malformed radix-64 payload: {0}")]
    Radix64(String),

    /// XOR output was not valid UTF-8.
    ///
    /// Usually means the peer used a different key or sent plaintext that
    /// happens to look like radix-64.
    #[error("decoded bytes are not valid UTF-8 (wrong key?)")]
    InvalidUtf8,

    /// Neither the cipher path nor the raw UTF-8 fallback produced text.
    ///
    /// Scoped to a single received chunk; the connection is unaffected.
    #[error("undecodable payload of {len} bytes")]
    Undecodable {
        /// Length of the received chunk.
        len: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cipher_error_display() {
        assert_eq!(CipherError::EmptyKey.to_string(), "key must not be empty");

        let err = CipherError::Undecodable { len: 7 };
        assert_eq!(err.to_string(), "undecodable payload of 7 bytes");

        let err = CipherError::Radix64("invalid padding".to_string());
        assert_eq!(err.to_string(), "malformed radix-64 payload: invalid padding");
    }
}
