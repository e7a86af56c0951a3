//! Presentation seam.

use murmur_net::Role;
use murmur_store::MessageKind;

/// Where a displayed line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Typed locally and sent to the peer.
    Sent,
    /// Received from the peer.
    Received,
    /// Connection or key notice.
    System,
}

impl Direction {
    /// History kind a line with this direction is recorded as.
    pub fn kind(self) -> MessageKind {
        match self {
            Self::Sent => MessageKind::Sent,
            Self::Received => MessageKind::Received,
            Self::System => MessageKind::System,
        }
    }
}

/// Receives everything a session wants the user to see.
///
/// Called on whatever task drives the [`Session`](crate::Session), never from
/// an endpoint worker, so implementations need no synchronization of their
/// own.
pub trait Presenter {
    /// Show one line of the conversation.
    fn display(&mut self, text: &str, sender: &str, direction: Direction);

    /// The session became active or idle.
    fn state_changed(&mut self, active: bool, role: Role);

    /// Show an error.
    fn error(&mut self, message: &str);
}
