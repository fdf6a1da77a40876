//! Default identity capability for the Dovecote protocol.
//!
//! This crate implements the opaque capability set the protocol layer
//! consumes: armored clearsigning (Ed25519) and multi-recipient hybrid
//! encryption (ephemeral X25519 key agreement, HKDF-SHA256 key
//! derivation, XChaCha20-Poly1305 AEAD). The protocol layer depends
//! only on the `Identity` trait from `dovecote-core`; nothing outside
//! this crate handles key material.
//!
//! # Security Properties
//!
//! - Sender recoverability: every envelope a [`KeyRing`] seals
//!   includes a stanza for the sender's own key, so senders can
//!   re-decrypt their own sent messages
//! - Stanza isolation: each recipient's copy of the content key is
//!   wrapped under an independently derived key; recipients learn
//!   nothing about each other beyond fingerprints
//! - Strict verification: signature checks use `verify_strict`, which
//!   rejects the malleable edge cases plain verification accepts

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod clearsign;
mod envelope;
mod fingerprint;
mod keyring;

pub use clearsign::{sign_text, verify_text};
pub use envelope::{open, seal};
pub use fingerprint::fingerprint_of;
pub use keyring::KeyRing;
