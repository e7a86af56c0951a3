//! Session error types.

use murmur_net::{NetError, Role};
use thiserror::Error;

/// Errors returned by [`Session`](crate::Session) operations.
///
/// History failures never show up here. They are reported to the presenter
/// and the conversation carries on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// An endpoint is already live; close it first.
    #[error("a {0} session is already active")]
    AlreadyActive(Role),

    /// No endpoint is live.
    #[error("no active session")]
    NotActive,

    /// The endpoint refused the operation.
    #[error(transparent)]
    Net(#[from] NetError),
}
