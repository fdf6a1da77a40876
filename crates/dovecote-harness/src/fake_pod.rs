//! A single-pod directory fake.
//!
//! `PodWorld` is the pod's shared state: registrations, aliases, inbox
//! queues, push subscribers, the pod-mediated message store, and a
//! strict single-use token ledger. `FakePod` is the per-identity
//! `Directory` facade over that world, so several identities can share
//! one pod the way real clients share a server.

use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex, MutexGuard},
};

use async_trait::async_trait;
use dovecote_client::{ClientError, Directory};
use dovecote_core::{Identity, message_key_for};
use dovecote_proto::{
    AliasEntry, InboxNotification, MessageKey, Token, TokenMethod, UserId,
};
use tokio::sync::mpsc;

use crate::push::{FakePush, push_pair};

/// One issued token and its consumption state.
struct IssuedToken {
    value: String,
    method: TokenMethod,
    resource: String,
    used: bool,
}

/// The pod's mutable state.
struct PodState {
    registered: HashSet<String>,
    aliases: HashMap<String, String>,
    inboxes: HashMap<String, Vec<InboxNotification>>,
    subscribers: HashMap<String, mpsc::UnboundedSender<Result<InboxNotification, ClientError>>>,
    tokens: Vec<IssuedToken>,
    stored: HashMap<String, String>,
    clock: u64,
}

/// A shared in-process pod.
#[derive(Clone)]
pub struct PodWorld {
    host: String,
    inner: Arc<Mutex<PodState>>,
}

impl PodWorld {
    /// Create a pod answering for `host`.
    pub fn new(host: &str) -> Self {
        Self {
            host: host.to_string(),
            inner: Arc::new(Mutex::new(PodState {
                registered: HashSet::new(),
                aliases: HashMap::new(),
                inboxes: HashMap::new(),
                subscribers: HashMap::new(),
                tokens: Vec::new(),
                stored: HashMap::new(),
                clock: 1_700_000_000_000,
            })),
        }
    }

    /// The host this pod answers for.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Open a push subscription for a user.
    pub fn subscribe(&self, user: &UserId) -> FakePush {
        let (tx, push) = push_pair();

        if let Ok(mut state) = self.inner.lock() {
            state.subscribers.insert(user.alias().to_string(), tx);
        }

        push
    }

    /// Every token issued so far, in issuance order.
    pub fn issued_tokens(&self) -> Vec<(TokenMethod, String)> {
        self.inner.lock().map_or_else(
            |_| Vec::new(),
            |state| {
                state
                    .tokens
                    .iter()
                    .map(|t| (t.method, t.resource.clone()))
                    .collect()
            },
        )
    }

    /// Queued notifications for a user.
    pub fn queued(&self, user: &UserId) -> Vec<InboxNotification> {
        self.inner.lock().map_or_else(
            |_| Vec::new(),
            |state| state.inboxes.get(user.alias()).cloned().unwrap_or_default(),
        )
    }
}

/// Per-identity `Directory` facade over a [`PodWorld`].
pub struct FakePod<I> {
    world: PodWorld,
    identity: Arc<I>,
}

impl<I> Clone for FakePod<I> {
    fn clone(&self) -> Self {
        Self { world: self.world.clone(), identity: Arc::clone(&self.identity) }
    }
}

impl<I: Identity> FakePod<I> {
    /// Create the facade for one identity.
    pub fn new(world: PodWorld, identity: Arc<I>) -> Self {
        Self { world, identity }
    }

    fn state(&self) -> Result<MutexGuard<'_, PodState>, ClientError> {
        self.world
            .inner
            .lock()
            .map_err(|_| ClientError::Transport { reason: "pod state poisoned".to_string() })
    }

    /// Validate and consume a token for `method` + `resource`.
    fn consume_token(
        state: &mut PodState,
        token: &Token,
        method: TokenMethod,
        resource: &str,
    ) -> Result<(), ClientError> {
        let Some(issued) = state.tokens.iter_mut().find(|t| t.value == token.value) else {
            return Err(ClientError::Server { status: 401, message: "unknown token".to_string() });
        };

        if issued.used {
            return Err(ClientError::Server {
                status: 401,
                message: "token already used".to_string(),
            });
        }

        if issued.method != method || issued.resource != resource {
            return Err(ClientError::Server {
                status: 403,
                message: "token out of scope".to_string(),
            });
        }

        issued.used = true;

        Ok(())
    }
}

#[async_trait]
impl<I: Identity> Directory for FakePod<I> {
    async fn register_identity(&self) -> Result<(), ClientError> {
        let mut state = self.state()?;
        state.registered.insert(self.identity.user_id().as_str().to_string());

        Ok(())
    }

    async fn create_alias(&self, alias: &str) -> Result<(), ClientError> {
        let mut state = self.state()?;

        if !state.registered.contains(self.identity.user_id().as_str()) {
            return Err(ClientError::Server {
                status: 403,
                message: "identity not registered".to_string(),
            });
        }

        if state.aliases.contains_key(alias) {
            return Err(ClientError::Server {
                status: 400,
                message: "alias already taken".to_string(),
            });
        }

        state
            .aliases
            .insert(alias.to_string(), self.identity.public_key_armored().to_string());

        Ok(())
    }

    async fn public_key_for(&self, user_id: &UserId) -> Result<String, ClientError> {
        let state = self.state()?;

        state.aliases.get(user_id.alias()).cloned().ok_or_else(|| ClientError::Server {
            status: 404,
            message: "no such alias".to_string(),
        })
    }

    async fn search_aliases(
        &self,
        _host: &str,
        text: &str,
    ) -> Result<Vec<AliasEntry>, ClientError> {
        let state = self.state()?;
        let host = &self.world.host;

        Ok(state
            .aliases
            .keys()
            .filter(|alias| alias.contains(text))
            .filter_map(|alias| {
                UserId::parse(&format!("{alias}@{host}"))
                    .ok()
                    .map(|user_id| AliasEntry { alias: alias.clone(), user_id })
            })
            .collect())
    }

    async fn create_token(
        &self,
        method: TokenMethod,
        resource: &str,
    ) -> Result<Token, ClientError> {
        let mut state = self.state()?;
        state.clock += 1;

        let value = format!("tok-{}", state.tokens.len());
        state.tokens.push(IssuedToken {
            value: value.clone(),
            method,
            resource: resource.to_string(),
            used: false,
        });

        Ok(Token { method, resource: resource.to_string(), value, issued_at: state.clock })
    }

    async fn inboxes(&self, token: &Token) -> Result<Vec<InboxNotification>, ClientError> {
        let mut state = self.state()?;

        Self::consume_token(&mut state, token, TokenMethod::Get, "/inboxes")?;

        let alias = self.identity.user_id().alias();
        Ok(state.inboxes.get(alias).cloned().unwrap_or_default())
    }

    async fn purge_inboxes(&self, token: &Token) -> Result<(), ClientError> {
        let mut state = self.state()?;

        Self::consume_token(&mut state, token, TokenMethod::Delete, "/inboxes")?;

        let alias = self.identity.user_id().alias().to_string();
        state.inboxes.remove(&alias);

        Ok(())
    }

    async fn send_message_key(
        &self,
        recipient: &UserId,
        key: &MessageKey,
    ) -> Result<(), ClientError> {
        let mut state = self.state()?;

        if !state.aliases.contains_key(recipient.alias()) {
            return Err(ClientError::Server {
                status: 404,
                message: "no such alias".to_string(),
            });
        }

        state.clock += 1;
        let notification = InboxNotification {
            key: key.clone(),
            from: self.identity.user_id().clone(),
            timestamp: state.clock,
        };

        state
            .inboxes
            .entry(recipient.alias().to_string())
            .or_default()
            .push(notification.clone());

        if let Some(subscriber) = state.subscribers.get(recipient.alias()) {
            let _ = subscriber.send(Ok(notification));
        }

        Ok(())
    }

    async fn store_message(&self, armored: &str) -> Result<MessageKey, ClientError> {
        let mut state = self.state()?;

        let key = message_key_for(armored);
        state.stored.insert(key.as_str().to_string(), armored.to_string());

        Ok(key)
    }

    async fn fetch_message(&self, key: &MessageKey) -> Result<String, ClientError> {
        let state = self.state()?;

        state.stored.get(key.as_str()).cloned().ok_or_else(|| ClientError::Server {
            status: 404,
            message: "no such message".to_string(),
        })
    }
}
