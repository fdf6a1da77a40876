//! Inbox notifications.

use serde::{Deserialize, Serialize};

use crate::{MessageKey, UserId};

/// A reference to a stored message, pushed or queued by a pod.
///
/// The notification carries no message content: only the DHT key of
/// the ciphertext, the sender, and the pod's receipt timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboxNotification {
    /// DHT key of the referenced message.
    pub key: MessageKey,

    /// The sender's user ID.
    pub from: UserId,

    /// Pod receipt time, milliseconds since the Unix epoch.
    pub timestamp: u64,
}

/// A notification together with its decrypted content.
///
/// The wire notification and the recovered plaintext are two explicit
/// fields; serializing a `DeliveredMessage` is deliberately not
/// supported, so the plaintext can never leak into a payload that was
/// only meant to carry the notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveredMessage {
    /// The notification exactly as received.
    pub notification: InboxNotification,

    /// The decrypted, signature-verified message text.
    pub text: String,
}
