//! Interactive chat loop.
//!
//! Reads lines from the terminal and events from the session concurrently
//! with `tokio::select!`, so incoming messages are printed while the user
//! is typing.

use std::io::Write;

use murmur_cipher::Key;
use murmur_session::Session;
use murmur_store::Store;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::{
    CliError, TerminalPresenter,
    commands::{Command, HELP},
};

/// Why the loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatExit {
    /// `/quit` was typed.
    Quit,
    /// Input reached end of file.
    InputClosed,
    /// The session went idle on its own (the server left).
    SessionEnded,
    /// Interrupted by Ctrl-C.
    Interrupted,
}

/// Run the conversation until the user leaves or the session ends, then
/// close it.
///
/// Input that is not valid UTF-8 is decoded lossily. The session is closed
/// on every exit path, including a failed read.
///
/// # Errors
///
/// Returns `CliError::Io` if reading input fails.
pub async fn run<W, S, R>(
    session: &mut Session<TerminalPresenter<W>, S>,
    mut input: R,
) -> Result<ChatExit, CliError>
where
    W: Write,
    S: Store,
    R: AsyncBufRead + Unpin,
{
    // Bytes of a partially read line survive a cancelled `read_until`
    let mut pending = Vec::new();
    let mut failure = None;

    let exit = loop {
        if !session.is_active() {
            break ChatExit::SessionEnded;
        }

        tokio::select! {
            read = input.read_until(b'\n', &mut pending) => match read {
                Ok(0) if pending.is_empty() => break ChatExit::InputClosed,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&pending).into_owned();
                    pending.clear();
                    if handle_line(session, &line).await {
                        break ChatExit::Quit;
                    }
                },
                Err(e) => {
                    failure = Some(e);
                    break ChatExit::InputClosed;
                },
            },
            _ = session.next_event() => {},
            _ = tokio::signal::ctrl_c() => break ChatExit::Interrupted,
        }
    };

    session.close().await;
    tracing::debug!(?exit, "chat loop finished");
    match failure {
        Some(e) => Err(e.into()),
        None => Ok(exit),
    }
}

/// Act on one typed line. Returns `true` when the user asked to quit.
async fn handle_line<W, S>(session: &mut Session<TerminalPresenter<W>, S>, line: &str) -> bool
where
    W: Write,
    S: Store,
{
    match Command::parse(line) {
        Command::Empty => {},
        Command::Say(text) => {
            // Failures are already reported to the presenter
            if let Err(e) = session.send(&text).await {
                tracing::debug!("send not completed: {e}");
            }
        },
        Command::SetKey(key) => session.set_key(key),
        Command::MissingKey => session.presenter_mut().info("usage: /key <new>, key unchanged"),
        Command::GenerateKey => {
            let key = Key::generate();
            let masked = key.masked();
            session.set_key(key);
            session.presenter_mut().info(&format!("Generated key {masked}"));
        },
        Command::Help => session.presenter_mut().info(HELP),
        Command::Unknown(name) => {
            session.presenter_mut().info(&format!("unknown command /{name}, try /help"));
        },
        Command::Quit => return true,
    }
    false
}
