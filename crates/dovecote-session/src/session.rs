//! The message session.
//!
//! A session owns one identity and sequences the send, receive, and
//! playback workflows over the storage gate and the directory client.
//! Within one operation the steps are a strict waterfall: each step's
//! output feeds the next, short-circuiting on the first failure. The
//! one deliberate fan-out is bulk key resolution for multi-recipient
//! sends, joined before encryption begins.
//!
//! Push-driven receives run on their own task over immutable captures
//! (identity, gate, event sender), so they proceed concurrently with
//! an in-flight send without any locking.

use std::sync::Arc;

use dovecote_client::{Directory, PushSource};
use dovecote_core::{
    Dht, DhtNetwork, Environment, Identity, StorageGate,
    connect::{self, PortMapper},
    message_key_for,
};
use dovecote_proto::{ClearSignedMessage, DeliveredMessage, InboxNotification, TokenMethod, UserId};
use futures_util::future::try_join_all;
use tokio::sync::{mpsc, watch};

use crate::{
    config::SessionConfig,
    error::SessionError,
    event::{MessageDescriptor, SessionEvent, SessionEvents, SessionState},
};

/// Token scope target for inbox operations.
const INBOXES_RESOURCE: &str = "/inboxes";

/// The orchestrating state machine.
///
/// Generic over the identity capability, the environment, the
/// directory, and the DHT handle, so the harness can fake every
/// collaborator.
pub struct MessageSession<I, E, D, S> {
    identity: Arc<I>,
    env: E,
    directory: D,
    gate: StorageGate<S>,
    state: watch::Sender<SessionState>,
    events: mpsc::UnboundedSender<SessionEvent>,
}

impl<I, E, D, S> MessageSession<I, E, D, S>
where
    I: Identity,
    E: Environment,
    D: Directory + Clone + 'static,
    S: Dht + Clone + Send + Sync + 'static,
{
    /// Open a session: storage connection, registration, alias, and
    /// (if supplied) the realtime push subscription.
    ///
    /// Registration precedes aliasing; either failure is terminal for
    /// this session instance. Returns the session and the receiving
    /// end of its event channel.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Connect` if the network join fails, or
    /// the directory's error if registration or aliasing fails. In
    /// every case the session state is `Error` and the caller must
    /// recreate the session.
    pub async fn connect<N, M, P>(
        identity: Arc<I>,
        env: E,
        directory: D,
        network: &N,
        mapper: &M,
        push: Option<P>,
        config: &SessionConfig,
    ) -> Result<(Self, SessionEvents), SessionError>
    where
        N: DhtNetwork<Handle = S>,
        M: PortMapper,
        P: PushSource + 'static,
    {
        let (state, _) = watch::channel(SessionState::Created);
        let (events, events_rx) = mpsc::unbounded_channel();

        state.send_replace(SessionState::Connecting);

        let gate = match connect::open_store(network, mapper, &config.store).await {
            Ok(gate) => gate,
            Err(e) => {
                state.send_replace(SessionState::Error);
                return Err(e.into());
            },
        };

        state.send_replace(SessionState::Registering);

        let alias = config
            .alias
            .clone()
            .unwrap_or_else(|| identity.user_id().alias().to_string());

        if let Err(e) = register(&directory, &alias).await {
            state.send_replace(SessionState::Error);
            return Err(e);
        }

        state.send_replace(SessionState::Ready);

        let session = Self { identity, env, directory, gate, state, events };

        if let Some(source) = push {
            session.attach_push(source);
        }

        let _ = session.events.send(SessionEvent::Ready);

        Ok((session, SessionEvents { rx: events_rx }))
    }

    /// Current session state.
    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Subscribe to state transitions.
    pub fn watch_state(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Attach a push source; its notifications are processed on a
    /// background task, each as an independent pipeline.
    ///
    /// A failed notification raises a session error event and the
    /// session remains `Ready`; one bad notification must not kill
    /// the session.
    pub fn attach_push<P>(&self, mut source: P) -> tokio::task::JoinHandle<()>
    where
        P: PushSource + 'static,
    {
        let gate = self.gate.clone();
        let identity = Arc::clone(&self.identity);
        let events = self.events.clone();

        tokio::spawn(async move {
            while let Some(item) = source.next_event().await {
                let outcome = match item {
                    Ok(notification) => {
                        resolve_notification(&gate, identity.as_ref(), notification).await
                    },
                    Err(e) => Err(e.into()),
                };

                let event = match outcome {
                    Ok(delivered) => SessionEvent::Message(delivered),
                    Err(e) => SessionEvent::Error(e),
                };

                if events.send(event).is_err() {
                    break;
                }
            }

            tracing::debug!("push channel closed");
        })
    }

    /// Send a message to one recipient.
    ///
    /// The five-step waterfall: sign for provenance, resolve the
    /// recipient's key, encrypt to recipient + self, store through the
    /// gate, notify the recipient's pod. A failure after the store but
    /// before the notify leaves an orphaned-but-harmless ciphertext —
    /// content-addressed storage has no owner to violate.
    ///
    /// # Errors
    ///
    /// Returns the first failing step's error unchanged; later steps
    /// are not attempted and nothing is retried.
    pub async fn send(
        &self,
        recipient: &UserId,
        message: &str,
    ) -> Result<MessageDescriptor, SessionError> {
        let mut descriptors = self.send_to_many(std::slice::from_ref(recipient), message).await?;

        // send_to_many returns exactly one descriptor per recipient.
        descriptors.pop().ok_or(SessionError::NoRecipients)
    }

    /// Send one message to several recipients.
    ///
    /// Key resolution fans out concurrently and is joined before
    /// encryption, which requires the complete recipient key set. Everything after it is the same sequential pipeline as a
    /// single-recipient send, with one pod notification per recipient.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NoRecipients` for an empty recipient
    /// set, otherwise the first failing step's error unchanged.
    pub async fn send_to_many(
        &self,
        recipients: &[UserId],
        message: &str,
    ) -> Result<Vec<MessageDescriptor>, SessionError> {
        let _guard = self.begin(SessionState::Sending)?;

        if recipients.is_empty() {
            return Err(SessionError::NoRecipients);
        }

        let signed = self.identity.sign(message)?;

        let keys = try_join_all(
            recipients.iter().map(|recipient| self.directory.public_key_for(recipient)),
        )
        .await?;

        // The capability adds the sender's own key to the set.
        let ciphertext = self.identity.encrypt(&keys, &signed)?;

        let key = message_key_for(&ciphertext);
        self.gate.put(&key, &ciphertext).await?;

        for recipient in recipients {
            self.directory.send_message_key(recipient, &key).await?;
        }

        let timestamp = self.env.now_unix_ms();

        Ok(recipients
            .iter()
            .map(|recipient| MessageDescriptor {
                key: key.clone(),
                recipient: recipient.clone(),
                timestamp,
            })
            .collect())
    }

    /// Fetch and decrypt a played-back notification.
    ///
    /// The same pipeline the realtime receive task runs, for
    /// notifications obtained through [`Self::playback`].
    ///
    /// # Errors
    ///
    /// Returns the gate's or the capability's error unchanged.
    pub async fn resolve(
        &self,
        notification: InboxNotification,
    ) -> Result<DeliveredMessage, SessionError> {
        let _guard = self.begin(SessionState::Receiving)?;

        resolve_notification(&self.gate, self.identity.as_ref(), notification).await
    }

    /// Fetch queued notifications and return them with a bound purge
    /// continuation.
    ///
    /// The fetch consumes a GET-scoped token; the continuation, when
    /// (and only when) the caller invokes it, obtains a separate
    /// DELETE-scoped token; tokens are single-method-scoped and never
    /// reused across methods. Purge is caller-invoked, never
    /// automatic: the caller decides when messages are durably
    /// processed.
    ///
    /// # Errors
    ///
    /// Returns the directory's error unchanged.
    pub async fn playback(
        &self,
    ) -> Result<(Vec<InboxNotification>, PurgeHandle<D>), SessionError> {
        let _guard = self.begin(SessionState::PlayingBack)?;

        let token = self.directory.create_token(TokenMethod::Get, INBOXES_RESOURCE).await?;
        let notifications = self.directory.inboxes(&token).await?;

        Ok((notifications, PurgeHandle { directory: self.directory.clone() }))
    }

    /// Enter a transient operation state, or refuse if the session is
    /// not `Ready`. The guard restores `Ready` on drop.
    fn begin(&self, op: SessionState) -> Result<OpGuard, SessionError> {
        let mut entered = false;
        let mut observed = SessionState::Error;

        self.state.send_if_modified(|state| {
            observed = *state;
            if *state == SessionState::Ready {
                *state = op;
                entered = true;
                true
            } else {
                false
            }
        });

        if entered {
            Ok(OpGuard { state: self.state.clone(), op })
        } else {
            Err(SessionError::NotReady { state: observed })
        }
    }
}

/// Restores `Ready` when a transient operation ends, however it ends.
struct OpGuard {
    state: watch::Sender<SessionState>,
    op: SessionState,
}

impl Drop for OpGuard {
    fn drop(&mut self) {
        self.state.send_if_modified(|state| {
            if *state == self.op {
                *state = SessionState::Ready;
                true
            } else {
                false
            }
        });
    }
}

/// A single-use continuation clearing the pod-side inbox queue.
pub struct PurgeHandle<D> {
    directory: D,
}

impl<D: Directory> PurgeHandle<D> {
    /// Obtain a DELETE-scoped token and purge the queue.
    ///
    /// # Errors
    ///
    /// Returns the directory's error unchanged.
    pub async fn purge(self) -> Result<(), SessionError> {
        let token = self.directory.create_token(TokenMethod::Delete, INBOXES_RESOURCE).await?;

        Ok(self.directory.purge_inboxes(&token).await?)
    }
}

/// Registration must precede aliasing.
async fn register<D: Directory>(directory: &D, alias: &str) -> Result<(), SessionError> {
    directory.register_identity().await?;
    directory.create_alias(alias).await?;

    Ok(())
}

/// The receive pipeline: gated fetch, decrypt, unwrap the signed
/// interior.
///
/// The wire notification and the recovered text stay separate fields;
/// only the notification is ever serialized.
async fn resolve_notification<S: Dht, I: Identity>(
    gate: &StorageGate<S>,
    identity: &I,
    notification: InboxNotification,
) -> Result<DeliveredMessage, SessionError> {
    let ciphertext = gate.get(&notification.key).await?;
    let decrypted = identity.decrypt(&ciphertext)?;

    // The interior is normally a clear-signed message; fall back to
    // the raw text for envelopes sealed over unsigned content.
    let text = match ClearSignedMessage::from_armored(&decrypted) {
        Ok(signed) => signed.text,
        Err(_) => decrypted,
    };

    Ok(DeliveredMessage { notification, text })
}

// Session behavior is exercised end-to-end in the harness crate, which
// provides the fake directory and DHT implementations; the unit tests
// here cover the state guard in isolation.
#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn guard_restores_ready() {
        let (state, _) = watch::channel(SessionState::Ready);

        {
            let _guard = OpGuard { state: state.clone(), op: SessionState::Sending };
            state.send_replace(SessionState::Sending);
        }

        assert_eq!(*state.borrow(), SessionState::Ready);
    }

    #[test]
    fn guard_leaves_foreign_states_alone() {
        let (state, _) = watch::channel(SessionState::Ready);

        {
            let _guard = OpGuard { state: state.clone(), op: SessionState::Sending };
            state.send_replace(SessionState::Error);
        }

        // A terminal transition during the operation survives the
        // guard.
        assert_eq!(*state.borrow(), SessionState::Error);
    }
}
