//! In-memory DHT fakes.

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use dovecote_core::{
    Dht, DhtError, DhtNetwork, StoreAck,
    connect::StoreConfig,
};
use dovecote_proto::MessageKey;

/// An in-memory DHT handle with call counters.
///
/// The counters let tests assert that the storage gate never invoked
/// the network for an invalid pair; [`Self::insert_raw`] plants
/// arbitrary values the way a misbehaving peer would.
#[derive(Clone, Default)]
pub struct MemoryDht {
    values: Arc<Mutex<HashMap<String, String>>>,
    puts: Arc<AtomicUsize>,
    gets: Arc<AtomicUsize>,
}

impl MemoryDht {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// How many times `put` reached this fake.
    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    /// How many times `get` reached this fake.
    pub fn get_count(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    /// Plant a value without any validation, as a compromised peer
    /// could.
    pub fn insert_raw(&self, key: &str, value: &str) {
        if let Ok(mut values) = self.values.lock() {
            values.insert(key.to_string(), value.to_string());
        }
    }

    /// Whether any value is stored under `key`.
    pub fn contains(&self, key: &MessageKey) -> bool {
        self.values.lock().is_ok_and(|values| values.contains_key(key.as_str()))
    }
}

#[async_trait]
impl Dht for MemoryDht {
    async fn get(&self, key: &MessageKey) -> Result<String, DhtError> {
        self.gets.fetch_add(1, Ordering::SeqCst);

        let values = self
            .values
            .lock()
            .map_err(|_| DhtError::Network { reason: "store poisoned".to_string() })?;

        values.get(key.as_str()).cloned().ok_or_else(|| DhtError::NotFound(key.clone()))
    }

    async fn put(&self, key: &MessageKey, value: &str) -> Result<StoreAck, DhtError> {
        self.puts.fetch_add(1, Ordering::SeqCst);

        let mut values = self
            .values
            .lock()
            .map_err(|_| DhtError::Network { reason: "store poisoned".to_string() })?;

        values.insert(key.as_str().to_string(), value.to_string());

        Ok(StoreAck { replicas: 1 })
    }
}

/// A network whose join hands out clones of one shared store.
#[derive(Clone, Default)]
pub struct MemoryNetwork {
    handle: MemoryDht,
}

impl MemoryNetwork {
    /// Create a network over a fresh store.
    pub fn new() -> Self {
        Self::default()
    }

    /// The shared store, for direct inspection in tests.
    pub fn store(&self) -> &MemoryDht {
        &self.handle
    }
}

#[async_trait]
impl DhtNetwork for MemoryNetwork {
    type Handle = MemoryDht;

    async fn join(
        &self,
        _address: &str,
        _config: &StoreConfig,
    ) -> Result<Self::Handle, DhtError> {
        Ok(self.handle.clone())
    }
}

/// A network whose join always fails.
#[derive(Clone, Copy, Default)]
pub struct DeadNetwork;

#[async_trait]
impl DhtNetwork for DeadNetwork {
    type Handle = MemoryDht;

    async fn join(
        &self,
        _address: &str,
        _config: &StoreConfig,
    ) -> Result<Self::Handle, DhtError> {
        Err(DhtError::Join { reason: "no seeds reachable".to_string() })
    }
}
