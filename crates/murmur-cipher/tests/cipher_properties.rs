//! Property-based tests for the stream cipher.
//!
//! Verifies symmetry for arbitrary keys and text, and that the output
//! actually depends on the key.

use murmur_cipher::{Encoding, Key, StreamCipher, xor_with_key};
use proptest::prelude::*;

/// Strategy for non-empty UTF-8 keys.
fn arbitrary_key() -> impl Strategy<Value = Key> {
    "\\PC{1,32}".prop_map(|s| Key::new(&s).unwrap())
}

proptest! {
    #[test]
    fn decode_inverts_encode(key in arbitrary_key(), text in "\\PC{0,256}") {
        let cipher = StreamCipher::new(key);
        let wire = cipher.encode(&text);
        prop_assert_eq!(cipher.decode(&wire).unwrap(), text);
    }

    #[test]
    fn fallback_reports_cipher_path_for_encoded_text(key in arbitrary_key(), text in "\\PC{0,256}") {
        let cipher = StreamCipher::new(key);
        let decoded = cipher.decode_with_fallback(&cipher.encode(&text)).unwrap();
        prop_assert_eq!(decoded.encoding, Encoding::Cipher);
        prop_assert_eq!(decoded.text, text);
    }

    #[test]
    fn wire_is_printable_ascii(key in arbitrary_key(), text in "\\PC{0,256}") {
        let wire = StreamCipher::new(key).encode(&text);
        prop_assert!(wire.iter().all(|b| b.is_ascii_alphanumeric() || matches!(b, b'+' | b'/' | b'=')));
    }

    #[test]
    fn xor_is_self_inverse(data in prop::collection::vec(any::<u8>(), 0..512), key in prop::collection::vec(any::<u8>(), 1..32)) {
        prop_assert_eq!(xor_with_key(&xor_with_key(&data, &key), &key), data);
    }

    #[test]
    fn changing_key_changes_decoded_text(text in "[a-z]{1,64}", first in "[a-z]{4,16}", second in "[A-Z]{4,16}") {
        // Disjoint alphabets guarantee the first key bytes differ
        let cipher = StreamCipher::new(Key::new(&first).unwrap());
        let wire = cipher.encode(&text);

        cipher.set_key(Key::new(&second).unwrap());
        let decoded = cipher.decode_with_fallback(&wire).unwrap();
        prop_assert_ne!(decoded.text, text);
    }

    #[test]
    fn fallback_never_fails_on_ascii(data in "[ -~]{0,256}") {
        let cipher = StreamCipher::default();
        prop_assert!(cipher.decode_with_fallback(data.as_bytes()).is_ok());
    }
}

#[test]
fn empty_text_round_trips_for_any_key() {
    for key in ["k", "key1", "default_key_123", "ключ"] {
        let cipher = StreamCipher::new(Key::new(key).unwrap());
        assert_eq!(cipher.decode(&cipher.encode("")).unwrap(), "");
    }
}
