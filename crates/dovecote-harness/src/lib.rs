//! In-process fakes for Dovecote integration testing.
//!
//! The protocol layer's collaborators are all traits; this crate
//! provides counting, scriptable implementations so the full
//! send/receive/playback workflows run without a network:
//!
//! - [`MemoryDht`] / [`MemoryNetwork`]: an in-memory content store
//!   with call counters and a raw-insert backdoor for adversarial
//!   tests
//! - [`DeadNetwork`]: a network whose join always fails
//! - [`PodWorld`] / [`FakePod`]: a single-pod directory with aliases,
//!   inbox queues, a strict single-use token ledger, and push
//!   delivery
//! - [`FakePush`]: a channel-backed push source

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod fake_pod;
mod memory_dht;
mod push;

pub use fake_pod::{FakePod, PodWorld};
pub use memory_dht::{DeadNetwork, MemoryDht, MemoryNetwork};
pub use push::{FakePush, push_pair};
