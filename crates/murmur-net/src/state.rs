//! Endpoint lifecycle states.
//!
//! # Listener
//!
//! ```text
//! ┌──────┐ start ┌─────────┐ bound ┌───────────┐ accept ┌───────────┐
//! │ Idle │──────>│ Binding │──────>│ Accepting │───────>│ Connected │
//! └──────┘       └─────────┘       └───────────┘<───────└───────────┘
//!                                        │      peer closed/error │
//!                                        │ stop                   │ stop
//!                                        ↓                        ↓
//!                                   ┌────────┐               ┌────────┐
//!                                   │ Closed │               │ Closed │
//!                                   └────────┘               └────────┘
//! ```
//!
//! Only one peer is served at a time. While `Connected`, further connection
//! attempts wait in the kernel backlog until the current peer leaves.
//!
//! # Initiator
//!
//! ```text
//! ┌──────┐ connect ┌────────────┐ handshake ┌───────────┐
//! │ Idle │────────>│ Connecting │──────────>│ Connected │
//! └──────┘         └────────────┘           └───────────┘
//!    ↑                                            │
//!    └────────── peer closed / error / disconnect ┘
//! ```

use std::net::SocketAddr;

/// Listener lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerState {
    /// Not started.
    Idle,
    /// Socket being bound.
    Binding,
    /// Waiting for a peer.
    Accepting,
    /// Serving one peer.
    Connected {
        /// Remote address of the peer.
        peer: SocketAddr,
    },
    /// Stopped; sockets released.
    Closed,
}

/// Initiator lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitiatorState {
    /// Not connected.
    Idle,
    /// TCP handshake in progress.
    Connecting,
    /// Connected to the peer.
    Connected {
        /// Remote address of the peer.
        peer: SocketAddr,
    },
}
