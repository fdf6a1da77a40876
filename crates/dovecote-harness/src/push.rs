//! Channel-backed push source.

use async_trait::async_trait;
use dovecote_client::{ClientError, PushSource};
use dovecote_proto::InboxNotification;
use tokio::sync::mpsc;

/// A push source fed from a channel.
///
/// Tests inject well-formed notifications, per-frame errors, or a
/// close (by dropping the sender).
pub struct FakePush {
    rx: mpsc::UnboundedReceiver<Result<InboxNotification, ClientError>>,
}

/// Create a connected sender/source pair.
pub fn push_pair() -> (
    mpsc::UnboundedSender<Result<InboxNotification, ClientError>>,
    FakePush,
) {
    let (tx, rx) = mpsc::unbounded_channel();
    (tx, FakePush { rx })
}

#[async_trait]
impl PushSource for FakePush {
    async fn next_event(&mut self) -> Option<Result<InboxNotification, ClientError>> {
        self.rx.recv().await
    }
}
