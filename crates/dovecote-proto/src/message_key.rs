//! Content-addressed storage keys.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize, de};
use thiserror::Error;

/// Length of a hex-encoded SHA-1 digest.
const KEY_LEN: usize = 40;

/// Errors from parsing a message key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessageKeyError {
    /// Key is not exactly 40 characters.
    #[error("message key must be {KEY_LEN} characters, got {0}")]
    BadLength(usize),

    /// Key contains a character outside `[0-9a-f]`.
    #[error("message key must be lowercase hex")]
    NotLowercaseHex,
}

/// A lowercase hex SHA-1 digest naming a value in the DHT.
///
/// The content-addressing invariant (`key == SHA1(value)`) is enforced
/// by the storage gate; this type only guarantees the key is
/// *syntactically* a digest, so a malformed key can never reach the
/// network.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct MessageKey(String);

impl MessageKey {
    /// Parse and validate a message key.
    ///
    /// # Errors
    ///
    /// Returns `MessageKeyError` if the input is not exactly 40
    /// lowercase hex characters.
    pub fn parse(input: &str) -> Result<Self, MessageKeyError> {
        if input.len() != KEY_LEN {
            return Err(MessageKeyError::BadLength(input.len()));
        }
        if !input.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
            return Err(MessageKeyError::NotLowercaseHex);
        }

        Ok(Self(input.to_string()))
    }

    /// Build a key from a raw SHA-1 digest.
    pub fn from_digest(digest: &[u8; 20]) -> Self {
        Self(digest.iter().map(|b| format!("{b:02x}")).collect())
    }

    /// The hex digest string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for MessageKey {
    type Err = MessageKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl<'de> Deserialize<'de> for MessageKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: de::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(de::Error::custom)
    }
}
