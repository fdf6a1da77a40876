//! The storage gate.
//!
//! Every read and write to the DHT passes through here. Two invariants
//! are enforced, in both directions:
//!
//! 1. Content addressing: the key is the lowercase hex SHA-1 digest of
//!    the value. A mismatched pair never reaches the network, and a
//!    storage peer that returns a value not matching its own key is
//!    caught before the value reaches the caller.
//! 2. Confidentiality: only well-formed encrypted envelopes are
//!    stored or released. Plaintext and signed-but-not-encrypted
//!    values are rejected on both paths.
//!
//! The gate holds no cache; the DHT is the source of truth.

use dovecote_proto::{Armor, ArmorError, MessageKey};
use sha1::{Digest, Sha1};
use thiserror::Error;

use crate::dht::{Dht, DhtError, StoreAck};

/// Errors from gated storage operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// Key is not the SHA-1 digest of the value.
    #[error("message key must be the SHA1 hash of the value (expected {expected}, got {provided})")]
    KeyMismatch {
        /// Digest actually computed from the value.
        expected: MessageKey,
        /// Key the caller (or a storage peer) claimed.
        provided: MessageKey,
    },

    /// Value is plaintext or signed-only, not an encrypted envelope.
    #[error("message must be encrypted")]
    Unencrypted,

    /// Value carries an armor frame but its structure is broken.
    #[error("message is not a well-formed envelope: {0}")]
    MalformedEnvelope(#[from] ArmorError),

    /// The underlying DHT failed.
    #[error(transparent)]
    Dht(#[from] DhtError),
}

/// Compute the content-addressed key for a value.
pub fn message_key_for(value: &str) -> MessageKey {
    let digest: [u8; 20] = Sha1::digest(value.as_bytes()).into();
    MessageKey::from_digest(&digest)
}

/// Gate enforcing content-addressing and confidentiality around a DHT
/// handle.
#[derive(Debug, Clone)]
pub struct StorageGate<D> {
    dht: D,
}

impl<D: Dht> StorageGate<D> {
    /// Wrap a DHT handle.
    pub fn new(dht: D) -> Self {
        Self { dht }
    }

    /// Store an encrypted value under its content address.
    ///
    /// The underlying DHT `put` is not invoked unless both invariants
    /// hold.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::KeyMismatch` or
    /// `StorageError::Unencrypted` before any network activity, or the
    /// DHT's own error afterwards.
    pub async fn put(&self, key: &MessageKey, value: &str) -> Result<StoreAck, StorageError> {
        validate(key, value)?;

        Ok(self.dht.put(key, value).await?)
    }

    /// Fetch a value and re-validate it before release.
    ///
    /// A compromised or buggy storage peer must not be able to smuggle
    /// a value that does not match its own key, or an unencrypted
    /// value, past this gate.
    ///
    /// # Errors
    ///
    /// Returns the DHT's error if the fetch fails, or the validation
    /// error (never the raw value) if the returned value violates an
    /// invariant.
    pub async fn get(&self, key: &MessageKey) -> Result<String, StorageError> {
        let value = self.dht.get(key).await?;

        validate(key, &value)?;

        Ok(value)
    }
}

/// Check both storage invariants for a key/value pair.
fn validate(key: &MessageKey, value: &str) -> Result<(), StorageError> {
    let expected = message_key_for(value);
    if expected != *key {
        return Err(StorageError::KeyMismatch { expected, provided: key.clone() });
    }

    match Armor::classify(value) {
        Ok(armor) if armor.is_encrypted() => Ok(()),
        Ok(_) => Err(StorageError::Unencrypted),
        Err(ArmorError::NotArmored) => Err(StorageError::Unencrypted),
        Err(e) => Err(StorageError::MalformedEnvelope(e)),
    }
}
