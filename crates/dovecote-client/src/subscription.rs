//! The realtime push channel.
//!
//! A long-lived WebSocket to the identity's own pod. The first client
//! frame is the hex-encoded signed empty-payload authenticator; every
//! subsequent server frame is a JSON inbox notification. A frame that
//! fails to parse surfaces as an error without closing the channel —
//! one bad frame must not kill the subscription.

use async_trait::async_trait;
use dovecote_core::{Environment, Identity};
use dovecote_proto::InboxNotification;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message as WsMessage,
};
use url::Url;

use crate::{directory::DirectoryClient, error::ClientError};

/// A source of inbox notifications.
///
/// Implemented by [`Subscription`] in production and by channel-backed
/// fakes in the harness. `None` means the channel closed; an `Err`
/// item is a per-frame failure that leaves the source usable.
#[async_trait]
pub trait PushSource: Send {
    /// Wait for the next notification, per-frame error, or channel
    /// close.
    async fn next_event(&mut self) -> Option<Result<InboxNotification, ClientError>>;
}

/// A live push subscription to the identity's own pod.
pub struct Subscription {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl<I: Identity, E: Environment> DirectoryClient<I, E> {
    /// Open the push subscription and perform the handshake.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::WebSocket` if the connection or handshake
    /// fails, or `ClientError::Transport` if the connect deadline
    /// expires.
    pub async fn subscribe(&self) -> Result<Subscription, ClientError> {
        let host = self.identity().user_id().pod_host();
        let ws_url = format!("wss://{host}");

        // Identity-type selection keys off the destination host, which
        // for the subscription is always the own pod.
        let handshake_destination = Url::parse(&format!("https://{host}/"))
            .map_err(|e| ClientError::Url { reason: e.to_string() })?;
        let payload = self.authenticator().build_handshake(&handshake_destination)?;

        let connect = connect_async(ws_url.as_str());
        let (mut ws, _) = tokio::time::timeout(self.config().connect_timeout, connect)
            .await
            .map_err(|_| ClientError::Transport {
                reason: format!("websocket connect to {host} timed out"),
            })?
            .map_err(|e| ClientError::WebSocket { reason: e.to_string() })?;

        ws.send(WsMessage::Text(hex::encode(payload.as_bytes())))
            .await
            .map_err(|e| ClientError::WebSocket { reason: e.to_string() })?;

        tracing::debug!(host, "push subscription established");

        Ok(Subscription { ws })
    }
}

#[async_trait]
impl PushSource for Subscription {
    async fn next_event(&mut self) -> Option<Result<InboxNotification, ClientError>> {
        loop {
            match self.ws.next().await? {
                Ok(WsMessage::Text(text)) => return Some(parse_frame(&text)),
                Ok(WsMessage::Binary(bytes)) => {
                    return Some(match std::str::from_utf8(&bytes) {
                        Ok(text) => parse_frame(text),
                        Err(e) => {
                            Err(ClientError::MalformedFrame { reason: e.to_string() })
                        },
                    });
                },
                Ok(WsMessage::Close(_)) => return None,
                // Ping/pong and raw frames are transport noise.
                Ok(_) => continue,
                Err(e) => {
                    return Some(Err(ClientError::WebSocket { reason: e.to_string() }));
                },
            }
        }
    }
}

/// Parse one push frame as a notification.
fn parse_frame(text: &str) -> Result<InboxNotification, ClientError> {
    serde_json::from_str(text).map_err(|e| ClientError::MalformedFrame { reason: e.to_string() })
}
