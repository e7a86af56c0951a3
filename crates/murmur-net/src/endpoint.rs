//! Role-erased endpoint handle.

use std::sync::Arc;

use murmur_cipher::{Key, StreamCipher};

use crate::{Initiator, Listener, NetError, Role};

/// Either side of a conversation.
///
/// The session layer holds one of these and does not care which role it
/// plays beyond labelling and persistence.
pub enum Endpoint {
    /// Server role.
    Listener(Listener),
    /// Client role.
    Initiator(Initiator),
}

impl Endpoint {
    /// Role this endpoint plays.
    pub fn role(&self) -> Role {
        match self {
            Self::Listener(_) => Role::Server,
            Self::Initiator(_) => Role::Client,
        }
    }

    /// Encode and send `text` to the peer.
    ///
    /// # Errors
    ///
    /// See [`Listener::send`] and [`Initiator::send`].
    pub async fn send(&self, text: &str) -> Result<(), NetError> {
        match self {
            Self::Listener(listener) => listener.send(text).await,
            Self::Initiator(initiator) => initiator.send(text).await,
        }
    }

    /// Stop the listener or disconnect the initiator. Idempotent.
    pub async fn stop(&self) {
        match self {
            Self::Listener(listener) => listener.stop().await,
            Self::Initiator(initiator) => initiator.disconnect().await,
        }
    }

    /// Rotate the key on the underlying cipher.
    pub fn set_key(&self, key: Key) {
        match self {
            Self::Listener(listener) => listener.set_key(key),
            Self::Initiator(initiator) => initiator.set_key(key),
        }
    }

    /// Cipher used by this endpoint.
    pub fn cipher(&self) -> &Arc<StreamCipher> {
        match self {
            Self::Listener(listener) => listener.cipher(),
            Self::Initiator(initiator) => initiator.cipher(),
        }
    }

    /// Whether a peer is attached.
    pub fn is_connected(&self) -> bool {
        match self {
            Self::Listener(listener) => listener.is_connected(),
            Self::Initiator(initiator) => initiator.is_connected(),
        }
    }

    /// Whether the endpoint has not been stopped or lost its connection.
    pub fn is_running(&self) -> bool {
        match self {
            Self::Listener(listener) => listener.is_running(),
            Self::Initiator(initiator) => initiator.is_running(),
        }
    }
}

impl From<Listener> for Endpoint {
    fn from(listener: Listener) -> Self {
        Self::Listener(listener)
    }
}

impl From<Initiator> for Endpoint {
    fn from(initiator: Initiator) -> Self {
        Self::Initiator(initiator)
    }
}
