//! Line-oriented terminal presenter.
//!
//! Prints each transcript line as `[HH:MM:SS] [TAG] text` to any writer,
//! stdout in the binary.

use std::io::Write;

use murmur_net::Role;
use murmur_session::{Direction, Presenter};

use crate::clock::{now_secs, time_of_day};

/// [`Presenter`] that writes a plain-text transcript.
pub struct TerminalPresenter<W: Write> {
    out: W,
    clock: fn() -> u64,
    active: Option<Role>,
}

impl<W: Write> TerminalPresenter<W> {
    /// Presenter writing to `out`, stamped with the wall clock.
    pub fn new(out: W) -> Self {
        Self::with_clock(out, now_secs)
    }

    /// Presenter writing to `out`, stamped by `clock` (Unix seconds).
    pub fn with_clock(out: W, clock: fn() -> u64) -> Self {
        Self { out, clock, active: None }
    }

    /// Role of the active session, as last reported.
    pub fn active_role(&self) -> Option<Role> {
        self.active
    }

    /// The underlying writer.
    pub fn writer(&self) -> &W {
        &self.out
    }

    /// Print an informational line that is not part of the conversation.
    pub fn info(&mut self, text: &str) {
        self.write_line("INFO", text);
    }

    fn write_line(&mut self, tag: &str, text: &str) {
        let stamp = time_of_day((self.clock)());
        let written = writeln!(self.out, "[{stamp}] [{tag}] {text}").and_then(|()| self.out.flush());
        if let Err(e) = written {
            tracing::debug!("transcript write failed: {e}");
        }
    }
}

impl<W: Write> Presenter for TerminalPresenter<W> {
    fn display(&mut self, text: &str, sender: &str, direction: Direction) {
        match direction {
            Direction::Sent => self.write_line("SENT", &format!("{sender}: {text}")),
            Direction::Received => self.write_line("RECV", &format!("{sender}: {text}")),
            Direction::System => self.write_line("INFO", text),
        }
    }

    fn state_changed(&mut self, active: bool, role: Role) {
        tracing::debug!(active, %role, "presenter state");
        self.active = active.then_some(role);
    }

    fn error(&mut self, message: &str) {
        self.write_line("ERROR", message);
    }
}
