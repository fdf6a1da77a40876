//! The external DHT collaborators.
//!
//! Routing, lookup, and replication belong to the DHT module; this
//! layer only needs `get`/`put` keyed by content digests, plus a way
//! to join the network. Everything is behind traits so the harness can
//! substitute in-memory fakes.

use async_trait::async_trait;
use dovecote_proto::MessageKey;
use thiserror::Error;

use crate::connect::StoreConfig;

/// Acknowledgement returned by a successful store.
///
/// Passed through to callers unchanged; the gate adds nothing to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StoreAck {
    /// How many peers accepted the value, as reported by the DHT.
    pub replicas: usize,
}

/// Errors from DHT operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DhtError {
    /// No value stored under the requested key.
    #[error("no value for key {0}")]
    NotFound(MessageKey),

    /// The network could not complete the operation.
    #[error("dht network error: {reason}")]
    Network {
        /// The DHT's description of the failure.
        reason: String,
    },

    /// Joining the network failed.
    #[error("dht join failed: {reason}")]
    Join {
        /// The DHT's description of the failure.
        reason: String,
    },
}

/// A live handle to the content-addressed key/value network.
#[async_trait]
pub trait Dht: Send + Sync {
    /// Fetch the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `DhtError::NotFound` or `DhtError::Network`.
    async fn get(&self, key: &MessageKey) -> Result<String, DhtError>;

    /// Store `value` under `key`.
    ///
    /// # Errors
    ///
    /// Returns `DhtError::Network` on failure.
    async fn put(&self, key: &MessageKey, value: &str) -> Result<StoreAck, DhtError>;
}

/// A DHT implementation that can be joined to obtain a live handle.
#[async_trait]
pub trait DhtNetwork: Send + Sync {
    /// The handle type produced by a successful join.
    type Handle: Dht;

    /// Join the network, binding to `address`.
    ///
    /// # Errors
    ///
    /// Returns `DhtError::Join` if the network cannot be joined; this
    /// is fatal for the connect attempt.
    async fn join(&self, address: &str, config: &StoreConfig) -> Result<Self::Handle, DhtError>;
}
