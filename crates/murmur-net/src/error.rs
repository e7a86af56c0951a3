//! Endpoint error types.

use thiserror::Error;

/// Errors returned by endpoint operations.
///
/// None of these are fatal to the process. After any of them the endpoint
/// (or the attempt to create one) has released its sockets, so a new
/// `start`/`connect` can be tried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetError {
    /// Host/port could not be resolved to a socket address.
    #[error("invalid address {addr}: {reason}")]
    InvalidAddress {
        /// Address as supplied by the caller.
        addr: String,
        /// Resolver error.
        reason: String,
    },

    /// Listener could not bind or listen.
    ///
    /// Address in use, permission denied, etc. Not retried.
    #[error("failed to bind {addr}: {reason}")]
    Bind {
        /// Address the listener tried to bind.
        addr: String,
        /// OS error.
        reason: String,
    },

    /// Initiator could not reach the peer.
    ///
    /// Refused, unreachable or timed out. Not retried.
    #[error("failed to connect to {addr}: {reason}")]
    Connect {
        /// Address the initiator dialed.
        addr: String,
        /// OS error or timeout.
        reason: String,
    },

    /// `send` was called with no peer attached.
    #[error("no peer connected")]
    NotConnected,

    /// Read or write failed on an established connection.
    #[error("transport error: {0}")]
    Transport(String),
}
