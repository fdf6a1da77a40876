//! One-time, method/resource-scoped bearer tokens.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// HTTP method a token is scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenMethod {
    /// Scoped to GET requests.
    #[serde(rename = "GET")]
    Get,

    /// Scoped to DELETE requests.
    #[serde(rename = "DELETE")]
    Delete,
}

impl TokenMethod {
    /// Wire form of the method name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for TokenMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A token presented for a method+resource pair it was not issued for.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("token scoped to {issued_method} {issued_resource} cannot authorize {requested_method} {requested_resource}")]
pub struct TokenScopeError {
    /// Method the token was issued for.
    pub issued_method: TokenMethod,
    /// Resource the token was issued for.
    pub issued_resource: String,
    /// Method of the attempted request.
    pub requested_method: TokenMethod,
    /// Resource of the attempted request.
    pub requested_resource: String,
}

/// A one-time bearer credential scoped to one method+resource pair.
///
/// Tokens are issued on demand immediately before use, consumed by
/// exactly one request, and never persisted. The scope check is
/// enforced locally before the token ever leaves the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// Method this token authorizes.
    pub method: TokenMethod,

    /// Resource path this token authorizes.
    pub resource: String,

    /// The bearer value issued by the pod.
    pub value: String,

    /// Issue time, milliseconds since the Unix epoch.
    pub issued_at: u64,
}

impl Token {
    /// Check this token against the method+resource pair of an
    /// intended request.
    ///
    /// # Errors
    ///
    /// Returns `TokenScopeError` if either the method or the resource
    /// differs from the issued scope.
    pub fn assert_scope(&self, method: TokenMethod, resource: &str) -> Result<(), TokenScopeError> {
        if self.method == method && self.resource == resource {
            return Ok(());
        }

        Err(TokenScopeError {
            issued_method: self.method,
            issued_resource: self.resource.clone(),
            requested_method: method,
            requested_resource: resource.to_string(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn token(method: TokenMethod) -> Token {
        Token {
            method,
            resource: "/inboxes".to_string(),
            value: "opaque-token".to_string(),
            issued_at: 1_700_000_000_000,
        }
    }

    #[test]
    fn matching_scope_passes() {
        assert!(token(TokenMethod::Get).assert_scope(TokenMethod::Get, "/inboxes").is_ok());
    }

    #[test]
    fn method_mismatch_rejected() {
        let err = token(TokenMethod::Get)
            .assert_scope(TokenMethod::Delete, "/inboxes")
            .unwrap_err();
        assert_eq!(err.issued_method, TokenMethod::Get);
        assert_eq!(err.requested_method, TokenMethod::Delete);
    }

    #[test]
    fn resource_mismatch_rejected() {
        assert!(token(TokenMethod::Get).assert_scope(TokenMethod::Get, "/aliases").is_err());
    }

    #[test]
    fn method_wire_names() {
        assert_eq!(TokenMethod::Get.as_str(), "GET");
        assert_eq!(TokenMethod::Delete.to_string(), "DELETE");
    }
}
