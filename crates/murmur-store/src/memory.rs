//! In-memory history store.

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use crate::{
    MessageId, MessageKind, MessageRecord, SearchHit, SessionId, SessionRecord, SessionStatus,
    Store, StoreError, matches_keyword,
    record::{newest_first, now_secs},
};

/// History store that lives only as long as the process.
///
/// All state sits behind one `Arc<Mutex<_>>`; clones share it.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryStoreInner>>,
}

#[derive(Default)]
struct MemoryStoreInner {
    last_session_id: SessionId,
    last_message_id: MessageId,
    sessions: BTreeMap<SessionId, SessionRecord>,
    /// Lines per session in insertion order
    messages: BTreeMap<SessionId, Vec<MessageRecord>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sessions currently held.
    pub fn session_count(&self) -> usize {
        self.lock().sessions.len()
    }

    /// Total number of lines across all sessions.
    pub fn message_count(&self) -> usize {
        self.lock().messages.values().map(Vec::len).sum()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryStoreInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Store for MemoryStore {
    fn create_session(&self, role: &str, host: &str, port: u16) -> Result<SessionId, StoreError> {
        let mut inner = self.lock();
        inner.last_session_id += 1;
        let id = inner.last_session_id;

        inner.sessions.insert(id, SessionRecord {
            id,
            role: role.to_string(),
            host: host.to_string(),
            port,
            started_at_secs: now_secs(),
            ended_at_secs: None,
            status: SessionStatus::Active,
        });
        inner.messages.insert(id, Vec::new());
        Ok(id)
    }

    fn end_session(&self, id: SessionId) -> Result<(), StoreError> {
        let mut inner = self.lock();
        let session = inner.sessions.get_mut(&id).ok_or(StoreError::SessionNotFound(id))?;
        if session.status == SessionStatus::Active {
            session.status = SessionStatus::Ended;
            session.ended_at_secs = Some(now_secs());
        }
        Ok(())
    }

    fn save_message(
        &self,
        id: SessionId,
        sender: &str,
        text: &str,
        kind: MessageKind,
    ) -> Result<MessageId, StoreError> {
        let mut inner = self.lock();
        if !inner.sessions.contains_key(&id) {
            return Err(StoreError::SessionNotFound(id));
        }

        inner.last_message_id += 1;
        let message = MessageRecord {
            id: inner.last_message_id,
            session_id: id,
            timestamp_secs: now_secs(),
            sender: sender.to_string(),
            text: text.to_string(),
            kind,
        };
        let message_id = message.id;
        inner.messages.entry(id).or_default().push(message);
        Ok(message_id)
    }

    fn session(&self, id: SessionId) -> Result<Option<SessionRecord>, StoreError> {
        Ok(self.lock().sessions.get(&id).cloned())
    }

    fn session_history(&self, id: SessionId) -> Result<Vec<MessageRecord>, StoreError> {
        Ok(self.lock().messages.get(&id).cloned().unwrap_or_default())
    }

    fn list_sessions(&self) -> Result<Vec<SessionRecord>, StoreError> {
        let mut sessions: Vec<_> = self.lock().sessions.values().cloned().collect();
        sessions.sort_by(|a, b| b.started_at_secs.cmp(&a.started_at_secs).then(b.id.cmp(&a.id)));
        Ok(sessions)
    }

    fn search_messages(&self, keyword: &str) -> Result<Vec<SearchHit>, StoreError> {
        let inner = self.lock();
        let mut hits: Vec<_> = inner
            .messages
            .iter()
            .filter_map(|(id, lines)| inner.sessions.get(id).map(|session| (session, lines)))
            .flat_map(|(session, lines)| {
                lines
                    .iter()
                    .filter(|line| matches_keyword(&line.text, keyword))
                    .map(move |line| SearchHit::new(line.clone(), session))
            })
            .collect();

        newest_first(&mut hits);
        Ok(hits)
    }

    fn delete_session(&self, id: SessionId) -> Result<bool, StoreError> {
        let mut inner = self.lock();
        inner.messages.remove(&id);
        Ok(inner.sessions.remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_start_at_one_and_are_not_reused() {
        let store = MemoryStore::new();
        assert_eq!(store.create_session("server", "127.0.0.1", 65432).unwrap(), 1);
        assert_eq!(store.create_session("client", "127.0.0.1", 65432).unwrap(), 2);

        assert!(store.delete_session(2).unwrap());
        assert_eq!(store.create_session("client", "127.0.0.1", 65432).unwrap(), 3);
    }

    #[test]
    fn history_is_oldest_first() {
        let store = MemoryStore::new();
        let id = store.create_session("client", "localhost", 1).unwrap();
        store.save_message(id, "You", "first", MessageKind::Sent).unwrap();
        store.save_message(id, "Server", "second", MessageKind::Received).unwrap();

        let history = store.session_history(id).unwrap();
        let texts: Vec<_> = history.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, ["first", "second"]);
        assert_eq!(history[1].kind, MessageKind::Received);
    }

    #[test]
    fn unknown_session_is_rejected() {
        let store = MemoryStore::new();
        assert_eq!(store.end_session(9), Err(StoreError::SessionNotFound(9)));
        assert_eq!(
            store.save_message(9, "You", "x", MessageKind::Sent),
            Err(StoreError::SessionNotFound(9))
        );
        assert!(store.session_history(9).unwrap().is_empty());
        assert!(!store.delete_session(9).unwrap());
    }

    #[test]
    fn end_session_keeps_first_end_time() {
        let store = MemoryStore::new();
        let id = store.create_session("server", "0.0.0.0", 5000).unwrap();
        store.end_session(id).unwrap();
        let first = store.session(id).unwrap().unwrap();
        store.end_session(id).unwrap();
        let second = store.session(id).unwrap().unwrap();

        assert_eq!(first.status, SessionStatus::Ended);
        assert!(first.ended_at_secs.is_some());
        assert_eq!(first, second);
    }

    #[test]
    fn delete_removes_lines() {
        let store = MemoryStore::new();
        let id = store.create_session("server", "0.0.0.0", 5000).unwrap();
        store.save_message(id, "You", "gone soon", MessageKind::Sent).unwrap();
        assert_eq!(store.message_count(), 1);

        assert!(store.delete_session(id).unwrap());
        assert_eq!(store.session_count(), 0);
        assert_eq!(store.message_count(), 0);
        assert!(store.search_messages("gone").unwrap().is_empty());
    }

    #[test]
    fn clones_share_state() {
        let store = MemoryStore::new();
        let clone = store.clone();
        let id = clone.create_session("client", "h", 1).unwrap();
        assert!(store.session(id).unwrap().is_some());
    }
}
