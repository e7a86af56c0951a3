//! Redb-backed durable history store.
//!
//! Every operation is one redb transaction, so a crash never leaves a
//! half-written session or line behind. Records are CBOR-encoded.

use std::{collections::BTreeMap, fmt, path::Path, sync::Arc};

use redb::{Database, ReadableTable, TableDefinition};
use serde::{Serialize, de::DeserializeOwned};

use crate::{
    MessageId, MessageKind, MessageRecord, SearchHit, SessionId, SessionRecord, SessionStatus,
    Store, StoreError, matches_keyword,
    record::{newest_first, now_secs},
};

/// Table: sessions
/// Key: session id as big-endian bytes [8 bytes]
/// Value: CBOR-encoded SessionRecord
const SESSIONS: TableDefinition<&[u8], &[u8]> = TableDefinition::new("sessions");

/// Table: messages
/// Key: (session id, message id) as big-endian bytes [16 bytes]
/// Value: CBOR-encoded MessageRecord
const MESSAGES: TableDefinition<&[u8], &[u8]> = TableDefinition::new("messages");

/// Table: counters
/// Key: counter name
/// Value: last id handed out
const COUNTERS: TableDefinition<&str, u64> = TableDefinition::new("counters");

const LAST_SESSION_ID: &str = "last_session_id";
const LAST_MESSAGE_ID: &str = "last_message_id";

/// Durable history store backed by a single redb file.
///
/// Thread-safe through redb's internal locking. Clone is cheap (Arc).
#[derive(Clone)]
pub struct RedbStore {
    db: Arc<Database>,
}

impl fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedbStore").finish_non_exhaustive()
    }
}

impl RedbStore {
    /// Open or create a history file at `path`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Io` if the database cannot be opened or created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let db = Database::create(path).map_err(io)?;

        let txn = db.begin_write().map_err(io)?;
        {
            let _ = txn.open_table(SESSIONS).map_err(io)?;
            let _ = txn.open_table(MESSAGES).map_err(io)?;
            let _ = txn.open_table(COUNTERS).map_err(io)?;
        }
        txn.commit().map_err(io)?;

        tracing::debug!(path = %path.display(), "history store opened");
        Ok(Self { db: Arc::new(db) })
    }

    fn load_sessions(&self) -> Result<BTreeMap<SessionId, SessionRecord>, StoreError> {
        let txn = self.db.begin_read().map_err(io)?;
        let table = txn.open_table(SESSIONS).map_err(io)?;

        let mut sessions = BTreeMap::new();
        for entry in table.iter().map_err(io)? {
            let (_, value) = entry.map_err(io)?;
            let session: SessionRecord = decode(value.value())?;
            sessions.insert(session.id, session);
        }
        Ok(sessions)
    }
}

impl Store for RedbStore {
    fn create_session(&self, role: &str, host: &str, port: u16) -> Result<SessionId, StoreError> {
        let txn = self.db.begin_write().map_err(io)?;
        let id = {
            let mut counters = txn.open_table(COUNTERS).map_err(io)?;
            let id = next_id(&mut counters, LAST_SESSION_ID)?;

            let session = SessionRecord {
                id,
                role: role.to_string(),
                host: host.to_string(),
                port,
                started_at_secs: now_secs(),
                ended_at_secs: None,
                status: SessionStatus::Active,
            };
            let mut sessions = txn.open_table(SESSIONS).map_err(io)?;
            sessions.insert(session_key(id).as_slice(), encode(&session)?.as_slice()).map_err(io)?;
            id
        };
        txn.commit().map_err(io)?;

        Ok(id)
    }

    fn end_session(&self, id: SessionId) -> Result<(), StoreError> {
        let txn = self.db.begin_write().map_err(io)?;
        {
            let mut sessions = txn.open_table(SESSIONS).map_err(io)?;
            let key = session_key(id);

            let mut session: SessionRecord = match sessions.get(key.as_slice()).map_err(io)? {
                Some(value) => decode(value.value())?,
                None => return Err(StoreError::SessionNotFound(id)),
            };
            if session.status == SessionStatus::Ended {
                return Ok(());
            }

            session.status = SessionStatus::Ended;
            session.ended_at_secs = Some(now_secs());
            sessions.insert(key.as_slice(), encode(&session)?.as_slice()).map_err(io)?;
        }
        txn.commit().map_err(io)?;

        Ok(())
    }

    fn save_message(
        &self,
        id: SessionId,
        sender: &str,
        text: &str,
        kind: MessageKind,
    ) -> Result<MessageId, StoreError> {
        let txn = self.db.begin_write().map_err(io)?;
        let message_id = {
            let sessions = txn.open_table(SESSIONS).map_err(io)?;
            if sessions.get(session_key(id).as_slice()).map_err(io)?.is_none() {
                return Err(StoreError::SessionNotFound(id));
            }

            let mut counters = txn.open_table(COUNTERS).map_err(io)?;
            let message_id = next_id(&mut counters, LAST_MESSAGE_ID)?;

            let message = MessageRecord {
                id: message_id,
                session_id: id,
                timestamp_secs: now_secs(),
                sender: sender.to_string(),
                text: text.to_string(),
                kind,
            };
            let mut messages = txn.open_table(MESSAGES).map_err(io)?;
            messages
                .insert(message_key(id, message_id).as_slice(), encode(&message)?.as_slice())
                .map_err(io)?;
            message_id
        };
        txn.commit().map_err(io)?;

        Ok(message_id)
    }

    fn session(&self, id: SessionId) -> Result<Option<SessionRecord>, StoreError> {
        let txn = self.db.begin_read().map_err(io)?;
        let table = txn.open_table(SESSIONS).map_err(io)?;

        match table.get(session_key(id).as_slice()).map_err(io)? {
            Some(value) => Ok(Some(decode(value.value())?)),
            None => Ok(None),
        }
    }

    fn session_history(&self, id: SessionId) -> Result<Vec<MessageRecord>, StoreError> {
        let txn = self.db.begin_read().map_err(io)?;
        let table = txn.open_table(MESSAGES).map_err(io)?;

        let start = message_key(id, 0);
        let end = message_key(id, MessageId::MAX);

        let mut history = Vec::new();
        for entry in table.range(start.as_slice()..=end.as_slice()).map_err(io)? {
            let (_, value) = entry.map_err(io)?;
            history.push(decode(value.value())?);
        }
        Ok(history)
    }

    fn list_sessions(&self) -> Result<Vec<SessionRecord>, StoreError> {
        let mut sessions: Vec<_> = self.load_sessions()?.into_values().collect();
        sessions.sort_by(|a, b| b.started_at_secs.cmp(&a.started_at_secs).then(b.id.cmp(&a.id)));
        Ok(sessions)
    }

    fn search_messages(&self, keyword: &str) -> Result<Vec<SearchHit>, StoreError> {
        let sessions = self.load_sessions()?;

        let txn = self.db.begin_read().map_err(io)?;
        let table = txn.open_table(MESSAGES).map_err(io)?;

        let mut hits = Vec::new();
        for entry in table.iter().map_err(io)? {
            let (_, value) = entry.map_err(io)?;
            let message: MessageRecord = decode(value.value())?;
            if !matches_keyword(&message.text, keyword) {
                continue;
            }
            if let Some(session) = sessions.get(&message.session_id) {
                hits.push(SearchHit::new(message, session));
            }
        }

        newest_first(&mut hits);
        Ok(hits)
    }

    fn delete_session(&self, id: SessionId) -> Result<bool, StoreError> {
        let txn = self.db.begin_write().map_err(io)?;
        let existed = {
            let mut sessions = txn.open_table(SESSIONS).map_err(io)?;
            let existed = sessions.remove(session_key(id).as_slice()).map_err(io)?.is_some();

            let mut messages = txn.open_table(MESSAGES).map_err(io)?;
            let start = message_key(id, 0);
            let end = message_key(id, MessageId::MAX);

            let mut keys = Vec::new();
            for entry in messages.range(start.as_slice()..=end.as_slice()).map_err(io)? {
                let (key, _) = entry.map_err(io)?;
                keys.push(key.value().to_vec());
            }
            for key in &keys {
                messages.remove(key.as_slice()).map_err(io)?;
            }
            existed
        };
        txn.commit().map_err(io)?;

        if existed {
            tracing::debug!(session_id = id, "session deleted");
        }
        Ok(existed)
    }
}

/// Bump and return the named counter.
fn next_id(counters: &mut redb::Table<'_, &'static str, u64>, name: &str) -> Result<u64, StoreError> {
    let last = counters.get(name).map_err(io)?.map_or(0, |value| value.value());
    let next = last + 1;
    counters.insert(name, next).map_err(io)?;
    Ok(next)
}

/// Encode a session id as an 8-byte big-endian key.
fn session_key(id: SessionId) -> [u8; 8] {
    id.to_be_bytes()
}

/// Encode (session id, message id) as a 16-byte big-endian key.
///
/// Layout: [session id: 8 bytes BE][message id: 8 bytes BE]
/// Lexicographic order is session order, then insertion order.
fn message_key(session_id: SessionId, message_id: MessageId) -> [u8; 16] {
    let mut key = [0u8; 16];
    key[..8].copy_from_slice(&session_id.to_be_bytes());
    key[8..].copy_from_slice(&message_id.to_be_bytes());
    key
}

fn encode<T: Serialize>(record: &T) -> Result<Vec<u8>, StoreError> {
    let mut bytes = Vec::new();
    ciborium::into_writer(record, &mut bytes)
        .map_err(|e| StoreError::Serialization(e.to_string()))?;
    Ok(bytes)
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StoreError> {
    ciborium::from_reader(bytes).map_err(|e| StoreError::Serialization(e.to_string()))
}

fn io(e: impl fmt::Display) -> StoreError {
    StoreError::Io(e.to_string())
}
