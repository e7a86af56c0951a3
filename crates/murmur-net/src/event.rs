//! Endpoint events.
//!
//! Workers never call back into the consumer directly. Everything they
//! observe is posted as an [`EndpointEvent`] on a bounded channel, and the
//! consumer decides which thread or event loop handles it. Events are
//! delivered in the order they happened.

use std::{fmt, net::SocketAddr};

use murmur_cipher::Encoding;

/// Sender label for messages this side sent.
pub const LOCAL_SENDER: &str = "You";

/// Sender label the initiator gives inbound messages.
pub const SERVER_SENDER: &str = "Server";

/// Sender label the listener gives messages from `peer`.
pub fn client_sender(peer: SocketAddr) -> String {
    format!("Client({})", peer.ip())
}

/// Which side of the conversation an endpoint plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Listener: binds and accepts one peer.
    Server,
    /// Initiator: connects to a known host.
    Client,
}

impl Role {
    /// Lowercase name, as recorded by persistence.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Server => "server",
            Self::Client => "client",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Something an endpoint worker observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndpointEvent {
    /// Listener accepted a peer.
    PeerConnected {
        /// Remote address of the peer.
        peer_addr: SocketAddr,
    },

    /// A received chunk was decoded.
    ///
    /// One event per socket read. No framing is applied, so a chunk may hold
    /// part of a message or several coalesced ones.
    Message {
        /// Decoded text.
        text: String,
        /// Sender label (`Server` or `Client(<ip>)`).
        sender: String,
        /// Whether the cipher or the plaintext fallback produced `text`.
        encoding: Encoding,
    },

    /// The connection ended (orderly close or transport error).
    ///
    /// Posted at most once per connection. A listener goes back to accepting;
    /// an initiator is finished.
    PeerDisconnected,

    /// Non-fatal problem worth surfacing to the user.
    Error {
        /// Human-readable description.
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_names() {
        assert_eq!(Role::Server.to_string(), "server");
        assert_eq!(Role::Client.as_str(), "client");
    }

    #[test]
    fn client_sender_uses_ip_only() {
        let peer: SocketAddr = "10.0.0.7:51234".parse().unwrap();
        assert_eq!(client_sender(peer), "Client(10.0.0.7)");
    }
}
