//! Message session state machine for the Dovecote protocol.
//!
//! The session is the orchestrator: it sequences signing, encryption,
//! storage, and notification into the send/receive/playback workflows,
//! driving the directory client and the storage gate while consuming
//! the identity capability.
//!
//! # Architecture
//!
//! ```text
//! MessageSession
//!   ├─ Identity        (sign/verify/encrypt/decrypt, owned externally)
//!   ├─ StorageGate     (content-addressing + confidentiality gate)
//!   ├─ Directory       (pod REST operations)
//!   └─ PushSource      (realtime inbox notifications, optional)
//! ```
//!
//! Session events (`ready`, `message`, `error`) arrive on an explicit
//! typed channel; session state is observable through a watch channel.
//! Neither uses ambient listener registration.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod config;
mod error;
mod event;
mod session;
mod system_env;

pub use config::SessionConfig;
pub use error::SessionError;
pub use event::{MessageDescriptor, SessionEvent, SessionEvents, SessionState};
pub use session::{MessageSession, PurgeHandle};
pub use system_env::SystemEnv;
