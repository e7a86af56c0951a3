//! Fuzz target for encode/decode symmetry
//!
//! # Invariants
//!
//! - decode(encode(s)) == s for every non-empty key and UTF-8 string
//! - Encoded output is printable radix-64 ASCII

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use murmur_cipher::{Key, StreamCipher};

#[derive(Debug, Arbitrary)]
struct Input {
    key: String,
    text: String,
}

fuzz_target!(|input: Input| {
    let Ok(key) = Key::new(&input.key) else {
        return;
    };
    let cipher = StreamCipher::new(key);

    let wire = cipher.encode(&input.text);
    assert!(wire.iter().all(|b| b.is_ascii_alphanumeric() || matches!(b, b'+' | b'/' | b'=')));
    assert_eq!(cipher.decode(&wire).as_deref(), Ok(input.text.as_str()));
});
