//! Fuzz target for the receive-side decode path
//!
//! Feeds arbitrary socket chunks through `decode_with_fallback` under an
//! arbitrary key.
//!
//! # Invariants
//!
//! - NEVER panic, whatever arrives on the wire
//! - Valid UTF-8 input always yields text (cipher or plaintext)
//! - Plaintext fallback returns the input unchanged

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use murmur_cipher::{Encoding, Key, StreamCipher};

#[derive(Debug, Arbitrary)]
struct Input {
    key: String,
    chunk: Vec<u8>,
}

fuzz_target!(|input: Input| {
    let cipher = StreamCipher::new(Key::from_input(&input.key));

    match cipher.decode_with_fallback(&input.chunk) {
        Ok(decoded) => {
            if decoded.encoding == Encoding::Plaintext {
                assert_eq!(decoded.text.as_bytes(), input.chunk.as_slice());
            }
        },
        Err(_) => assert!(std::str::from_utf8(&input.chunk).is_err()),
    }
});
