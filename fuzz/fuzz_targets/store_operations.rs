//! Fuzz target for history store bookkeeping
//!
//! Runs an arbitrary sequence of store operations against `MemoryStore`.
//!
//! # Invariants
//!
//! - NEVER panic
//! - Session ids strictly increase and are never reused
//! - Lines are only accepted for live sessions
//! - A session's history is returned in insertion order
//! - Deleted sessions leave no lines behind

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use murmur_store::{MemoryStore, MessageKind, Store, StoreError};

#[derive(Debug, Arbitrary)]
enum Op {
    Create { port: u16 },
    End { id: u8 },
    Save { id: u8, text: String, sent: bool },
    Delete { id: u8 },
    Search { keyword: String },
}

fuzz_target!(|ops: Vec<Op>| {
    let store = MemoryStore::new();
    let mut last_id = 0;

    for op in ops {
        match op {
            Op::Create { port } => {
                let id = store.create_session("client", "127.0.0.1", port).unwrap();
                assert!(id > last_id);
                last_id = id;
            },
            Op::End { id } => {
                let id = u64::from(id);
                let exists = store.session(id).unwrap().is_some();
                let result = store.end_session(id);
                assert_eq!(result.is_ok(), exists);
            },
            Op::Save { id, text, sent } => {
                let id = u64::from(id);
                let kind = if sent { MessageKind::Sent } else { MessageKind::Received };
                match store.save_message(id, "You", &text, kind) {
                    Ok(_) => {
                        let history = store.session_history(id).unwrap();
                        assert_eq!(history.last().map(|m| m.text.as_str()), Some(text.as_str()));
                        assert!(history.windows(2).all(|w| w[0].id < w[1].id));
                    },
                    Err(e) => assert_eq!(e, StoreError::SessionNotFound(id)),
                }
            },
            Op::Delete { id } => {
                let id = u64::from(id);
                store.delete_session(id).unwrap();
                assert!(store.session_history(id).unwrap().is_empty());
                assert!(store.search_messages("").unwrap().iter().all(|h| h.message.session_id != id));
            },
            Op::Search { keyword } => {
                let _ = store.search_messages(&keyword).unwrap();
            },
        }
    }
});
