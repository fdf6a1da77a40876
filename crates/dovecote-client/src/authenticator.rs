//! Request authentication.
//!
//! Any identity can prove authorship of a request to any pod without a
//! prior handshake: the request body is a canonical form-encoded
//! payload carrying a strictly increasing nonce and a reference to the
//! signer's key, clear-signed by that key. Same-pod servers verify the
//! key by its hash; cross-pod servers receive a URL they can
//! dereference to fetch the key.

use std::sync::Arc;

use dovecote_core::{CryptoError, Environment, Identity, NonceSource};
use dovecote_proto::{IdentityRef, PayloadError, PayloadFields};
use thiserror::Error;
use url::Url;

/// Errors from payload construction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// The operation requires at least one payload field.
    #[error("payload requires at least one field")]
    EmptyPayload,

    /// The destination URL carries no host to compare against.
    #[error("destination url has no host: {url}")]
    NoHost {
        /// The offending URL.
        url: String,
    },

    /// Canonical encoding failed.
    #[error(transparent)]
    Encode(#[from] PayloadError),

    /// The signing capability failed; propagated unchanged.
    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

/// Builds signed request payloads for an identity.
///
/// Pure aside from signing: the only thing resembling network state is
/// the public-key URL built for cross-pod destinations, and building a
/// URL makes no call.
pub struct RequestAuthenticator<I, E> {
    identity: Arc<I>,
    nonces: NonceSource<E>,
}

impl<I, E: Clone> Clone for RequestAuthenticator<I, E> {
    fn clone(&self) -> Self {
        Self { identity: Arc::clone(&self.identity), nonces: self.nonces.clone() }
    }
}

impl<I: Identity, E: Environment> RequestAuthenticator<I, E> {
    /// Create an authenticator for the given identity.
    pub fn new(identity: Arc<I>, env: E) -> Self {
        Self { identity, nonces: NonceSource::new(env) }
    }

    /// Build the signed payload for a request to `destination`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::EmptyPayload` for an empty field set —
    /// every authenticated operation carries at least one field (alias
    /// creation, for instance, cannot be payload-less). Signing errors
    /// propagate unchanged.
    pub fn build_payload(
        &self,
        destination: &Url,
        fields: PayloadFields,
    ) -> Result<String, AuthError> {
        if fields.is_empty() {
            return Err(AuthError::EmptyPayload);
        }

        self.build(destination, fields)
    }

    /// Build the signed empty-payload authenticator for the push
    /// subscription handshake.
    ///
    /// The handshake is the one place an empty field set is valid: the
    /// injected nonce/identity fields are the entire message.
    ///
    /// # Errors
    ///
    /// Returns `AuthError` on encoding or signing failure.
    pub fn build_handshake(&self, destination: &Url) -> Result<String, AuthError> {
        self.build(destination, PayloadFields::new())
    }

    fn build(&self, destination: &Url, fields: PayloadFields) -> Result<String, AuthError> {
        let dest_host = destination
            .host_str()
            .ok_or_else(|| AuthError::NoHost { url: destination.to_string() })?;

        let identity_ref = self.identity_ref_for(dest_host);
        let canonical = fields.canonical_encode(self.nonces.next(), &identity_ref)?;

        Ok(self.identity.sign(&canonical)?)
    }

    /// Pick the identity form: a key hash for the sender's own pod, a
    /// dereferenceable key URL for everyone else.
    fn identity_ref_for(&self, dest_host: &str) -> IdentityRef {
        let own = self.identity.user_id();

        if dest_host == own.pod_host() {
            IdentityRef::PubkeyHash(self.identity.fingerprint().to_string())
        } else {
            IdentityRef::Href(format!("https://{}/aliases/{}", own.pod_host(), own.alias()))
        }
    }
}
