//! User identifiers.
//!
//! A user is addressed as `alias@podhost`: the alias names the user on
//! their directory server, the pod host is where that server answers.
//! Malformed identifiers are rejected here, synchronously, before any
//! network call can be built from them.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize, de};
use thiserror::Error;

/// Errors from parsing a user identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UserIdError {
    /// No `@` separator present.
    #[error("userID must contain \"@<hostname>\"")]
    MissingSeparator,

    /// More than one `@` present.
    #[error("userID may only contain a single @ character")]
    MultipleSeparators,

    /// Nothing before the `@`.
    #[error("userID must have alias before the @ character")]
    EmptyAlias,

    /// Nothing after the `@`.
    #[error("userID needs pod hostname after @ character")]
    EmptyHost,
}

/// A validated `alias@podhost` identifier.
///
/// Construction is the validation boundary: a `UserId` value always
/// has a non-empty alias, a non-empty pod host, and exactly one `@`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Parse and validate a user identifier.
    ///
    /// # Errors
    ///
    /// Returns `UserIdError` if the input has zero or more than one
    /// `@`, an empty alias, or an empty host.
    pub fn parse(input: &str) -> Result<Self, UserIdError> {
        let mut parts = input.split('@');

        let alias = parts.next().unwrap_or_default();
        let host = parts.next().ok_or(UserIdError::MissingSeparator)?;

        if parts.next().is_some() {
            return Err(UserIdError::MultipleSeparators);
        }
        if alias.is_empty() {
            return Err(UserIdError::EmptyAlias);
        }
        if host.is_empty() {
            return Err(UserIdError::EmptyHost);
        }

        Ok(Self(input.to_string()))
    }

    /// The alias part (before the `@`).
    pub fn alias(&self) -> &str {
        self.0.split('@').next().unwrap_or_default()
    }

    /// The pod host part (after the `@`).
    pub fn pod_host(&self) -> &str {
        self.0.split('@').nth(1).unwrap_or_default()
    }

    /// The full `alias@podhost` string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for UserId {
    type Err = UserIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl<'de> Deserialize<'de> for UserId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: de::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(de::Error::custom)
    }
}
