//! The pod directory client.
//!
//! Translates domain operations into REST calls whose bodies come from
//! the request authenticator. Cross-pod operations resolve the
//! destination pod host from the target user ID immediately before
//! building the request URL; the client never reuses a host resolved
//! for a different identity.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use dovecote_core::{Environment, Identity};
use dovecote_proto::{
    AliasEntry, InboxNotification, MessageKey, PayloadFields, Token, TokenMethod, UserId,
};
use serde::Deserialize;
use url::Url;

use crate::{
    authenticator::RequestAuthenticator,
    error::ClientError,
    response::{normalize_empty, normalize_json, normalize_text},
};

/// Resource path for inbox operations (token scope target).
const INBOXES_RESOURCE: &str = "/inboxes";

/// Configuration for the directory client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Deadline for a whole request (connect + transfer).
    pub request_timeout: Duration,

    /// Deadline for establishing a connection.
    pub connect_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// The directory operations the session layer programs against.
///
/// `DirectoryClient` is the production implementation; the harness
/// substitutes an in-process fake.
#[async_trait]
pub trait Directory: Send + Sync {
    /// Register this identity's public key with its own pod.
    async fn register_identity(&self) -> Result<(), ClientError>;

    /// Bind an alias to this identity at its own pod.
    async fn create_alias(&self, alias: &str) -> Result<(), ClientError>;

    /// Fetch the armored public key published under a user ID.
    async fn public_key_for(&self, user_id: &UserId) -> Result<String, ClientError>;

    /// Search aliases at a pod.
    async fn search_aliases(
        &self,
        host: &str,
        text: &str,
    ) -> Result<Vec<AliasEntry>, ClientError>;

    /// Obtain a one-time token scoped to `method` + `resource`.
    async fn create_token(
        &self,
        method: TokenMethod,
        resource: &str,
    ) -> Result<Token, ClientError>;

    /// List queued inbox notifications.
    async fn inboxes(&self, token: &Token) -> Result<Vec<InboxNotification>, ClientError>;

    /// Clear the pod-side inbox queue.
    async fn purge_inboxes(&self, token: &Token) -> Result<(), ClientError>;

    /// Notify a recipient's pod of a stored message key.
    async fn send_message_key(
        &self,
        recipient: &UserId,
        key: &MessageKey,
    ) -> Result<(), ClientError>;

    /// Ask the own pod to store a message in the DHT (pod-mediated
    /// path for clients without a storage connection).
    async fn store_message(&self, armored: &str) -> Result<MessageKey, ClientError>;

    /// Ask the own pod to fetch a message from the DHT.
    async fn fetch_message(&self, key: &MessageKey) -> Result<String, ClientError>;
}

/// Token grant body returned by `POST /tokens`.
#[derive(Debug, Deserialize)]
struct TokenGrant {
    token: String,
}

/// Key body returned by `POST /messages`.
#[derive(Debug, Deserialize)]
struct StoredKey {
    key: MessageKey,
}

/// HTTPS client for pod directory operations.
pub struct DirectoryClient<I, E> {
    http: reqwest::Client,
    authenticator: RequestAuthenticator<I, E>,
    identity: Arc<I>,
    env: E,
    base: Url,
    config: ClientConfig,
}

impl<I, E> Clone for DirectoryClient<I, E>
where
    E: Clone,
{
    fn clone(&self) -> Self {
        Self {
            http: self.http.clone(),
            authenticator: self.authenticator.clone(),
            identity: Arc::clone(&self.identity),
            env: self.env.clone(),
            base: self.base.clone(),
            config: self.config.clone(),
        }
    }
}

impl<I: Identity, E: Environment> DirectoryClient<I, E> {
    /// Create a client bound to the identity's own pod.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Url` if the pod host does not form a
    /// valid base URL, or `ClientError::Transport` if the HTTP client
    /// cannot be built.
    pub fn new(identity: Arc<I>, env: E, config: &ClientConfig) -> Result<Self, ClientError> {
        let base = pod_url(identity.user_id().pod_host(), "/")?;

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(ClientError::from)?;

        let authenticator = RequestAuthenticator::new(Arc::clone(&identity), env.clone());

        Ok(Self { http, authenticator, identity, env, base, config: config.clone() })
    }

    /// The authenticator this client signs payloads with.
    pub fn authenticator(&self) -> &RequestAuthenticator<I, E> {
        &self.authenticator
    }

    /// The identity this client acts for.
    pub fn identity(&self) -> &Arc<I> {
        &self.identity
    }

    /// The configuration this client was built with.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// URL of a path on the identity's own pod.
    fn own_url(&self, path: &str) -> Result<Url, ClientError> {
        self.base
            .join(path)
            .map_err(|e| ClientError::Url { reason: e.to_string() })
    }

    async fn post_signed(&self, url: Url, fields: PayloadFields) -> Result<(), ClientError> {
        let payload = self.authenticator.build_payload(&url, fields)?;

        let response = self.http.post(url).body(payload).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        normalize_empty(status, &body)
    }
}

#[async_trait]
impl<I: Identity, E: Environment> Directory for DirectoryClient<I, E> {
    async fn register_identity(&self) -> Result<(), ClientError> {
        // Bootstrap step: the body is the clear-signed public key
        // itself (self-certifying), with no auth payload attached —
        // there is no established trust to authenticate against yet.
        let signed_key = self.identity.sign(self.identity.public_key_armored())?;

        let response = self.http.post(self.base.clone()).body(signed_key).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        tracing::debug!(status, "registered identity");

        normalize_empty(status, &body)
    }

    async fn create_alias(&self, alias: &str) -> Result<(), ClientError> {
        let url = self.own_url("/aliases")?;

        self.post_signed(url, PayloadFields::from_pairs([("alias", alias)])).await
    }

    async fn public_key_for(&self, user_id: &UserId) -> Result<String, ClientError> {
        let url = pod_url(user_id.pod_host(), &format!("/aliases/{}", user_id.alias()))?;

        let response = self.http.get(url).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        normalize_text(status, body)
    }

    async fn search_aliases(
        &self,
        host: &str,
        text: &str,
    ) -> Result<Vec<AliasEntry>, ClientError> {
        let mut url = pod_url(host, "/aliases")?;
        url.query_pairs_mut().append_pair("search", text);

        let payload = self
            .authenticator
            .build_payload(&url, PayloadFields::from_pairs([("search", text)]))?;

        let response = self.http.get(url).body(payload).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        normalize_json(status, &body)
    }

    async fn create_token(
        &self,
        method: TokenMethod,
        resource: &str,
    ) -> Result<Token, ClientError> {
        let url = self.own_url("/tokens")?;

        let payload = self.authenticator.build_payload(
            &url,
            PayloadFields::from_pairs([("method", method.as_str()), ("resource", resource)]),
        )?;

        let response = self.http.post(url).body(payload).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        let grant: TokenGrant = normalize_json(status, &body)?;

        Ok(Token {
            method,
            resource: resource.to_string(),
            value: grant.token,
            issued_at: self.env.now_unix_ms(),
        })
    }

    async fn inboxes(&self, token: &Token) -> Result<Vec<InboxNotification>, ClientError> {
        token.assert_scope(TokenMethod::Get, INBOXES_RESOURCE)?;

        let mut url = self.own_url(INBOXES_RESOURCE)?;
        url.query_pairs_mut().append_pair("token", &token.value);

        let response = self.http.get(url).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        normalize_json(status, &body)
    }

    async fn purge_inboxes(&self, token: &Token) -> Result<(), ClientError> {
        token.assert_scope(TokenMethod::Delete, INBOXES_RESOURCE)?;

        let mut url = self.own_url(INBOXES_RESOURCE)?;
        url.query_pairs_mut().append_pair("token", &token.value);

        let response = self.http.delete(url).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        normalize_empty(status, &body)
    }

    async fn send_message_key(
        &self,
        recipient: &UserId,
        key: &MessageKey,
    ) -> Result<(), ClientError> {
        // Resolve the destination pod from the recipient, never from
        // any previously computed host.
        let url = pod_url(recipient.pod_host(), &format!("/inboxes/{}", recipient.alias()))?;

        self.post_signed(
            url,
            PayloadFields::from_pairs([
                ("key", key.as_str()),
                ("from", self.identity.user_id().as_str()),
            ]),
        )
        .await
    }

    async fn store_message(&self, armored: &str) -> Result<MessageKey, ClientError> {
        let url = self.own_url("/messages")?;

        let response = self.http.post(url).body(armored.to_string()).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        let stored: StoredKey = normalize_json(status, &body)?;

        Ok(stored.key)
    }

    async fn fetch_message(&self, key: &MessageKey) -> Result<String, ClientError> {
        let url = self.own_url(&format!("/messages/{key}"))?;

        let response = self.http.get(url).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        normalize_text(status, body)
    }
}

/// Build an HTTPS URL on a pod host.
fn pod_url(host: &str, path: &str) -> Result<Url, ClientError> {
    Url::parse(&format!("https://{host}{path}"))
        .map_err(|e| ClientError::Url { reason: e.to_string() })
}
