//! Conversation history for murmur.
//!
//! A [`Store`] records each conversation as a session together with every
//! line shown for it: messages sent and received plus connection and error
//! notices. Persistence is optional for the chat itself. The session layer
//! reports store failures but never lets them end a conversation.
//!
//! Two backends are provided:
//!
//! - [`MemoryStore`]: process-local, for tests and `--no-history` runs
//! - [`RedbStore`]: durable file-backed store, CBOR-encoded records

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod error;
mod memory;
mod record;
mod redb;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use record::{
    MessageId, MessageKind, MessageRecord, SearchHit, SessionId, SessionRecord, SessionStatus,
};

pub use self::redb::RedbStore;

/// History persistence.
///
/// Synchronous, like the rest of the storage seams in this workspace: every
/// call is a short local transaction. Implementations share their state
/// through `Arc`, so clones see the same data.
pub trait Store: Clone + Send + Sync + 'static {
    /// Record the start of a conversation and return its id.
    ///
    /// Ids are allocated monotonically starting at 1 and never reused, even
    /// after [`Store::delete_session`].
    fn create_session(&self, role: &str, host: &str, port: u16) -> Result<SessionId, StoreError>;

    /// Mark a session ended.
    ///
    /// Ending an already ended session keeps its first end time.
    ///
    /// # Errors
    ///
    /// `StoreError::SessionNotFound` if `id` is unknown.
    fn end_session(&self, id: SessionId) -> Result<(), StoreError>;

    /// Append a line to a session.
    ///
    /// # Errors
    ///
    /// `StoreError::SessionNotFound` if `id` is unknown.
    fn save_message(
        &self,
        id: SessionId,
        sender: &str,
        text: &str,
        kind: MessageKind,
    ) -> Result<MessageId, StoreError>;

    /// Look up one session. `None` if it does not exist.
    fn session(&self, id: SessionId) -> Result<Option<SessionRecord>, StoreError>;

    /// Every line of a session, oldest first. Empty for unknown ids.
    fn session_history(&self, id: SessionId) -> Result<Vec<MessageRecord>, StoreError>;

    /// All sessions, newest first.
    fn list_sessions(&self) -> Result<Vec<SessionRecord>, StoreError>;

    /// Lines whose text contains `keyword`, ignoring case, newest first.
    ///
    /// An empty keyword matches every line.
    fn search_messages(&self, keyword: &str) -> Result<Vec<SearchHit>, StoreError>;

    /// Remove a session and all of its lines.
    ///
    /// Returns `false` if there was nothing to remove.
    fn delete_session(&self, id: SessionId) -> Result<bool, StoreError>;
}

/// Case-insensitive substring match used by both backends.
pub(crate) fn matches_keyword(text: &str, keyword: &str) -> bool {
    keyword.is_empty() || text.to_lowercase().contains(&keyword.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_match_ignores_case() {
        assert!(matches_keyword("Hello World", "world"));
        assert!(matches_keyword("Hello World", "LO W"));
        assert!(!matches_keyword("Hello World", "planet"));
        assert!(matches_keyword("anything", ""));
    }
}
