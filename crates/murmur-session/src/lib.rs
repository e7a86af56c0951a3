//! Conversation façade for murmur.
//!
//! A [`Session`] owns at most one live endpoint and turns what it reports
//! into calls on two collaborators: a [`Presenter`] that shows lines to the
//! user and an optional [`Store`](murmur_store::Store) that keeps history.
//!
//! # Components
//!
//! - [`Session`]: start, send, rotate keys, close
//! - [`Presenter`]: display seam implemented by frontends
//! - [`Direction`]: sent, received or system line

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod error;
mod presenter;
mod session;

pub use error::SessionError;
pub use presenter::{Direction, Presenter};
pub use session::{SYSTEM_SENDER, Session};
