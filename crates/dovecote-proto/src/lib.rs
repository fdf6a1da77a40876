//! Wire-level types for the Dovecote message exchange protocol.
//!
//! Everything in this crate is pure data: parsing, validation, and
//! serialization with no I/O and no cryptography. The invariants that
//! higher layers rely on are enforced at construction time:
//!
//! - [`UserId`]: a well-formed `alias@podhost` identifier
//! - [`MessageKey`]: a lowercase 40-character hex SHA-1 digest
//! - [`Armor`]: an ASCII-armored envelope that is verifiably encrypted
//!   (or clear-signed) before any byte of it touches the network
//!
//! # Components
//!
//! - [`UserId`]: identity addressing (`alias@podhost`)
//! - [`MessageKey`]: content-addressed storage keys
//! - [`Armor`], [`EncryptedEnvelope`], [`SignatureBlock`]: envelope
//!   framing and classification
//! - [`IdentityRef`], [`PayloadFields`]: authenticated-payload
//!   primitives
//! - [`Token`], [`TokenMethod`]: one-time method/resource-scoped
//!   credentials
//! - [`InboxNotification`]: message references pushed or queued by pods

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod alias;
mod armor;
mod error_body;
mod message_key;
mod notification;
mod payload;
mod token;
mod user_id;

pub use alias::AliasEntry;
pub use armor::{
    Armor, ArmorError, ClearSignedMessage, EncryptedEnvelope, EncryptedKeyBundle, PublicKeyBundle,
    RecipientStanza, SignatureBlock,
};
pub use error_body::ErrorBody;
pub use message_key::{MessageKey, MessageKeyError};
pub use notification::{DeliveredMessage, InboxNotification};
pub use payload::{IdentityRef, PayloadError, PayloadFields};
pub use token::{Token, TokenMethod, TokenScopeError};
pub use user_id::{UserId, UserIdError};
