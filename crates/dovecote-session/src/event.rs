//! Session states and events.

use std::fmt;

use dovecote_proto::{DeliveredMessage, MessageKey, UserId};
use tokio::sync::mpsc;

use crate::error::SessionError;

/// The session lifecycle.
///
/// `Created → Connecting → Registering → Ready`, with the transient
/// operation states returning to `Ready` and `Error` terminal for the
/// session instance: a failed session is recreated, never revived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Constructed, nothing opened yet.
    Created,

    /// Opening the storage connection.
    Connecting,

    /// Registering the identity and creating the alias.
    Registering,

    /// Idle and usable.
    Ready,

    /// A send pipeline is in flight.
    Sending,

    /// A caller-initiated receive pipeline is in flight.
    Receiving,

    /// A playback fetch is in flight.
    PlayingBack,

    /// Terminal failure; recreate the session.
    Error,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Created => "created",
            Self::Connecting => "connecting",
            Self::Registering => "registering",
            Self::Ready => "ready",
            Self::Sending => "sending",
            Self::Receiving => "receiving",
            Self::PlayingBack => "playing back",
            Self::Error => "error",
        };
        f.write_str(name)
    }
}

/// Descriptor returned by a successful send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageDescriptor {
    /// Content address of the stored ciphertext.
    pub key: MessageKey,

    /// Who was notified.
    pub recipient: UserId,

    /// Send completion time, milliseconds since the Unix epoch.
    pub timestamp: u64,
}

/// Events surfaced on the session's outbound channel.
#[derive(Debug)]
pub enum SessionEvent {
    /// The session reached `Ready`.
    Ready,

    /// A pushed notification was fetched and decrypted.
    Message(DeliveredMessage),

    /// A non-fatal failure (one notification, one frame). The session
    /// remains usable.
    Error(SessionError),
}

/// The receiving end of a session's event channel.
pub struct SessionEvents {
    pub(crate) rx: mpsc::UnboundedReceiver<SessionEvent>,
}

impl SessionEvents {
    /// Wait for the next session event; `None` after the session is
    /// dropped.
    pub async fn next(&mut self) -> Option<SessionEvent> {
        self.rx.recv().await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn state_display_names() {
        assert_eq!(SessionState::Ready.to_string(), "ready");
        assert_eq!(SessionState::PlayingBack.to_string(), "playing back");
    }
}
