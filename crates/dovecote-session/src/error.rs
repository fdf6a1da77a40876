//! Session error types.

use dovecote_client::ClientError;
use dovecote_core::{CryptoError, StorageError, connect::ConnectError};
use thiserror::Error;

use crate::event::SessionState;

/// Errors from session operations.
///
/// Pipeline steps fail fast: whichever layer failed first is returned
/// unchanged, and later steps are simply not attempted.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The session is not in a state that admits the operation.
    #[error("session is {state}, not ready")]
    NotReady {
        /// The state the session was observed in.
        state: SessionState,
    },

    /// A send was attempted with no recipients.
    #[error("send requires at least one recipient")]
    NoRecipients,

    /// Opening the storage connection failed; terminal.
    #[error(transparent)]
    Connect(#[from] ConnectError),

    /// A directory operation failed.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// The identity capability failed.
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// The storage gate rejected or could not complete an operation.
    #[error(transparent)]
    Storage(#[from] StorageError),
}
