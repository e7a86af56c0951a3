//! Store error types.

use thiserror::Error;

use crate::SessionId;

/// Errors returned by [`Store`](crate::Store) implementations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Backend I/O or transaction failure.
    #[error("storage I/O error: {0}")]
    Io(String),

    /// A stored record could not be encoded or decoded.
    #[error("record serialization error: {0}")]
    Serialization(String),

    /// No session with this id exists.
    #[error("session {0} not found")]
    SessionNotFound(SessionId),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_session() {
        assert_eq!(StoreError::SessionNotFound(7).to_string(), "session 7 not found");
    }
}
