//! Client error types.

use dovecote_core::CryptoError;
use dovecote_proto::{MessageKeyError, TokenScopeError, UserIdError};
use thiserror::Error;

use crate::authenticator::AuthError;

/// Errors from directory operations and the push channel.
#[derive(Debug, Error)]
pub enum ClientError {
    /// A user ID failed validation before any network call.
    #[error("invalid user id: {0}")]
    UserId(#[from] UserIdError),

    /// A message key failed validation before any network call.
    #[error("invalid message key: {0}")]
    MessageKey(#[from] MessageKeyError),

    /// Payload construction failed.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// The identity capability reported a failure.
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// A token was presented outside its issued scope.
    #[error(transparent)]
    TokenScope(#[from] TokenScopeError),

    /// A URL could not be built or has no host.
    #[error("invalid url: {reason}")]
    Url {
        /// Description of the failure.
        reason: String,
    },

    /// Connection, DNS, or timeout failure. Surfaced, never retried
    /// by this layer.
    #[error("transport error: {reason}")]
    Transport {
        /// Description of the failure.
        reason: String,
    },

    /// The pod answered non-200 with a stated error.
    #[error("pod returned {status}: {message}")]
    Server {
        /// HTTP status code.
        status: u16,
        /// The server's stated error message.
        message: String,
    },

    /// A response body was not the JSON this operation expects.
    #[error("failed to parse response body")]
    ResponseParse,

    /// A push frame was not a well-formed notification. The
    /// subscription remains usable.
    #[error("malformed push frame: {reason}")]
    MalformedFrame {
        /// Parser's description of the failure.
        reason: String,
    },

    /// The push channel failed.
    #[error("websocket error: {reason}")]
    WebSocket {
        /// Description of the failure.
        reason: String,
    },
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport { reason: err.to_string() }
    }
}
