//! Single-peer TCP endpoints for murmur.
//!
//! Two roles share one wire format (see `murmur-cipher`):
//!
//! - [`Listener`] binds a port and serves one peer at a time
//! - [`Initiator`] connects to a listener once
//!
//! Each endpoint runs its socket work in a background tokio task and posts
//! what it sees as [`EndpointEvent`]s on a bounded channel returned by its
//! constructor. Sends happen on the caller's task.
//!
//! # Wire format
//!
//! Each send writes exactly the encoded bytes of one message, with no length
//! prefix or delimiter. Each read of up to `read_chunk` bytes is decoded on
//! its own, so messages that are split or coalesced by TCP are delivered as
//! they arrive on the socket.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod addr;
mod config;
mod endpoint;
mod error;
mod event;
mod initiator;
mod listener;
mod state;
mod worker;

pub use config::{
    DEFAULT_CONNECT_TIMEOUT, DEFAULT_EVENT_CAPACITY, DEFAULT_POLL_INTERVAL, DEFAULT_READ_CHUNK,
    EndpointConfig,
};
pub use endpoint::Endpoint;
pub use error::NetError;
pub use event::{EndpointEvent, LOCAL_SENDER, Role, SERVER_SENDER, client_sender};
pub use initiator::Initiator;
pub use listener::Listener;
pub use state::{InitiatorState, ListenerState};
