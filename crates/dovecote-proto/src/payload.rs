//! Authenticated-payload primitives.
//!
//! An authenticated request body is an ordered set of caller fields
//! with three injected fields appended: `nonce`, `identity`, and
//! `identity_type`. The whole set is serialized as a canonical
//! form-encoded string (insertion order, standard percent escaping)
//! and then clear-signed by the sender. Pods verify the signature and
//! replay-check the nonce; no prior handshake or shared secret exists.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How a request names the identity that signed it.
///
/// Same-pod servers already hold the sender's key, so a cheap key hash
/// suffices; cross-pod servers get a URL they can dereference to fetch
/// the key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum IdentityRef {
    /// Fingerprint of the sender's public key. Used when the
    /// destination host is the sender's own pod.
    PubkeyHash(String),

    /// Dereferenceable URL of the sender's public key. Used for every
    /// other destination.
    Href(String),
}

impl IdentityRef {
    /// Wire value for the `identity_type` field.
    pub fn type_tag(&self) -> &'static str {
        match self {
            Self::PubkeyHash(_) => "pubkeyhash",
            Self::Href(_) => "href",
        }
    }

    /// Wire value for the `identity` field.
    pub fn value(&self) -> &str {
        match self {
            Self::PubkeyHash(v) | Self::Href(v) => v,
        }
    }
}

/// Errors from payload encoding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayloadError {
    /// Form encoding failed.
    #[error("payload encoding failed: {reason}")]
    Encode {
        /// Encoder's description of the failure.
        reason: String,
    },
}

/// Ordered payload fields for an authenticated request.
///
/// Order matters: the signed string is the canonical encoding of the
/// fields in insertion order, so sender and verifier must agree on it
/// byte for byte.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PayloadFields {
    pairs: Vec<(String, String)>,
}

impl PayloadFields {
    /// An empty field set (only valid for the subscription handshake).
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a field set from key/value pairs, preserving order.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self { pairs: pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect() }
    }

    /// Append a field.
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.pairs.push((key.into(), value.into()));
    }

    /// Whether any caller fields are present.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Number of caller fields.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Inject the authentication fields and produce the canonical
    /// form-encoded string to be signed.
    ///
    /// # Errors
    ///
    /// Returns `PayloadError::Encode` if form encoding fails.
    pub fn canonical_encode(
        mut self,
        nonce: u64,
        identity: &IdentityRef,
    ) -> Result<String, PayloadError> {
        self.pairs.push(("nonce".to_string(), nonce.to_string()));
        self.pairs.push(("identity".to_string(), identity.value().to_string()));
        self.pairs.push(("identity_type".to_string(), identity.type_tag().to_string()));

        serde_urlencoded::to_string(&self.pairs)
            .map_err(|e| PayloadError::Encode { reason: e.to_string() })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn identity_ref_tags() {
        let hash = IdentityRef::PubkeyHash("abcd".to_string());
        assert_eq!(hash.type_tag(), "pubkeyhash");
        assert_eq!(hash.value(), "abcd");

        let href = IdentityRef::Href("https://pod.example/aliases/alice".to_string());
        assert_eq!(href.type_tag(), "href");
    }

    #[test]
    fn canonical_encoding_preserves_insertion_order() {
        let fields = PayloadFields::from_pairs([("alias", "alice")]);
        let encoded =
            fields.canonical_encode(1700000000123, &IdentityRef::PubkeyHash("ff00".into())).unwrap();

        assert_eq!(
            encoded,
            "alias=alice&nonce=1700000000123&identity=ff00&identity_type=pubkeyhash"
        );
    }

    #[test]
    fn values_are_percent_escaped() {
        let fields = PayloadFields::from_pairs([("alias", "a b&c")]);
        let encoded =
            fields.canonical_encode(1, &IdentityRef::PubkeyHash("00".into())).unwrap();

        assert!(encoded.starts_with("alias=a+b%26c&"));
    }

    #[test]
    fn empty_fields_encode_only_injected() {
        let fields = PayloadFields::new();
        assert!(fields.is_empty());

        let href = IdentityRef::Href("https://pod.example/aliases/alice".to_string());
        let encoded = fields.canonical_encode(42, &href).unwrap();

        assert_eq!(
            encoded,
            "nonce=42&identity=https%3A%2F%2Fpod.example%2Faliases%2Falice&identity_type=href"
        );
    }

    #[test]
    fn push_appends_in_order() {
        let mut fields = PayloadFields::new();
        fields.push("method", "GET");
        fields.push("resource", "/inboxes");
        assert_eq!(fields.len(), 2);

        let encoded =
            fields.canonical_encode(7, &IdentityRef::PubkeyHash("aa".into())).unwrap();
        assert!(encoded.starts_with("method=GET&resource=%2Finboxes&nonce=7&"));
    }
}
