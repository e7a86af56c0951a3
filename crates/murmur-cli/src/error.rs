//! CLI error type.

use std::io;

use murmur_session::SessionError;
use murmur_store::StoreError;
use thiserror::Error;

/// Errors that end a `murmur` invocation.
#[derive(Debug, Error)]
pub enum CliError {
    /// Terminal I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// History operation failed.
    #[error("history error: {0}")]
    Store(#[from] StoreError),

    /// Could not start the conversation.
    #[error(transparent)]
    Session(#[from] SessionError),
}
