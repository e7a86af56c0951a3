//! Records kept by the history store.

use std::{
    fmt,
    time::{SystemTime, UNIX_EPOCH},
};

use serde::{Deserialize, Serialize};

/// Identifier of a recorded conversation. Allocated from 1 upwards.
pub type SessionId = u64;

/// Identifier of a recorded message. Allocated from 1 upwards, shared by all
/// sessions, so it also gives the global insertion order.
pub type MessageId = u64;

/// Whether a recorded conversation is still going.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatus {
    /// Not yet ended.
    Active,
    /// [`Store::end_session`](crate::Store::end_session) was called.
    Ended,
}

impl SessionStatus {
    /// Lowercase name for listings.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Ended => "ended",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a recorded line was.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageKind {
    /// Typed locally and sent to the peer.
    Sent,
    /// Received from the peer.
    Received,
    /// Connection notice.
    System,
    /// Error notice.
    Error,
}

impl MessageKind {
    /// Lowercase name for listings.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::Received => "received",
            Self::System => "system",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recorded conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Session id.
    pub id: SessionId,
    /// `"server"` or `"client"`.
    pub role: String,
    /// Host bound or connected to.
    pub host: String,
    /// Port bound or connected to.
    pub port: u16,
    /// Unix seconds when the session was created.
    pub started_at_secs: u64,
    /// Unix seconds when the session was ended, if it has been.
    pub ended_at_secs: Option<u64>,
    /// Current status.
    pub status: SessionStatus,
}

/// One recorded line of a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    /// Message id.
    pub id: MessageId,
    /// Owning session.
    pub session_id: SessionId,
    /// Unix seconds when the line was recorded.
    pub timestamp_secs: u64,
    /// Display label of the author (`You`, `Server`, `Client(ip)`, `System`).
    pub sender: String,
    /// Line text.
    pub text: String,
    /// What the line was.
    pub kind: MessageKind,
}

/// A message matching a search, with the session it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    /// The matching message.
    pub message: MessageRecord,
    /// Role of the owning session.
    pub role: String,
    /// Host of the owning session.
    pub host: String,
    /// Port of the owning session.
    pub port: u16,
}

impl SearchHit {
    pub(crate) fn new(message: MessageRecord, session: &SessionRecord) -> Self {
        Self { message, role: session.role.clone(), host: session.host.clone(), port: session.port }
    }
}

/// Current wall clock time in Unix seconds.
pub(crate) fn now_secs() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
}

/// Newest first, ties broken by id.
pub(crate) fn newest_first(hits: &mut [SearchHit]) {
    hits.sort_by(|a, b| {
        b.message
            .timestamp_secs
            .cmp(&a.message.timestamp_secs)
            .then(b.message.id.cmp(&a.message.id))
    });
}
