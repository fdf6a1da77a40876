//! Directory client for Dovecote pods.
//!
//! Pods are per-user directory/API servers: they store aliases,
//! authenticate requests, issue tokens, and relay inbox notifications.
//! This crate maps the domain operations onto the pod REST surface and
//! maintains the realtime push channel.
//!
//! # Components
//!
//! - [`RequestAuthenticator`]: builds the signed, nonce-stamped,
//!   identity-typed payload proving authorship of a request with no
//!   handshake or shared secret involved
//! - [`DirectoryClient`]: the HTTPS client for every pod operation
//! - [`Subscription`]: the WebSocket push channel for realtime inbox
//!   notifications
//! - [`Directory`], [`PushSource`]: the seams the session layer (and
//!   the test harness) program against

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod authenticator;
mod directory;
mod error;
mod response;
mod subscription;

pub use authenticator::{AuthError, RequestAuthenticator};
pub use directory::{ClientConfig, Directory, DirectoryClient};
pub use error::ClientError;
pub use subscription::{PushSource, Subscription};
