//! Terminal front end for murmur.
//!
//! The binary wires a [`murmur_session::Session`] to a line-oriented
//! [`TerminalPresenter`] and, unless disabled, a redb history file.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod chat;
pub mod clock;
pub mod commands;
pub mod error;
pub mod history;
pub mod terminal;

pub use chat::ChatExit;
pub use commands::Command;
pub use error::CliError;
pub use terminal::TerminalPresenter;
