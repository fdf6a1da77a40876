//! Protocol invariants for the Dovecote message exchange layer.
//!
//! This crate holds the pieces where correctness bugs would be silent
//! and security-relevant: the storage gate that decides what may enter
//! the content-addressed network, the capability traits that keep
//! cryptography and the DHT behind seams, and the environment
//! abstraction that makes nonce generation and time testable.
//!
//! # Components
//!
//! - [`Environment`], [`NonceSource`]: time, entropy, and strictly
//!   increasing request nonces
//! - [`Identity`]: the opaque sign/verify/encrypt/decrypt capability
//! - [`Dht`], [`DhtNetwork`], [`PortMapper`]: the external storage
//!   collaborators
//! - [`StorageGate`]: content-addressing and confidentiality
//!   enforcement on every read and write
//! - [`connect`]: store-connection setup with the port-forward
//!   fallback policy

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod connect;
mod dht;
mod env;
mod identity;
mod storage_gate;

pub use connect::{ConnectError, NoPortMapper, PortMapper, PortMapperError, StoreConfig};
pub use dht::{Dht, DhtError, DhtNetwork, StoreAck};
pub use env::{Environment, NonceSource};
pub use identity::{CryptoError, Identity};
pub use storage_gate::{StorageError, StorageGate, message_key_for};
