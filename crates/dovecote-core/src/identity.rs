//! The identity capability.
//!
//! Cryptographic primitives are consumed as an opaque capability set:
//! the protocol layer never sees key material, only armored strings in
//! and out. `dovecote-crypto` provides the production implementation;
//! tests may substitute anything that honors the contract below.

use dovecote_proto::UserId;
use thiserror::Error;

/// Errors reported by an identity's cryptographic operations.
///
/// These are surfaced verbatim to callers; the protocol layer never
/// retries or reinterprets them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    /// Signing failed.
    #[error("signing failed: {reason}")]
    Sign {
        /// The capability's description of the failure.
        reason: String,
    },

    /// Signature verification failed.
    #[error("verification failed: {reason}")]
    Verify {
        /// The capability's description of the failure.
        reason: String,
    },

    /// Encryption failed.
    #[error("encryption failed: {reason}")]
    Encrypt {
        /// The capability's description of the failure.
        reason: String,
    },

    /// Decryption failed.
    #[error("decryption failed: {reason}")]
    Decrypt {
        /// The capability's description of the failure.
        reason: String,
    },

    /// A supplied key could not be used.
    #[error("unusable key: {reason}")]
    BadKey {
        /// What was wrong with the key.
        reason: String,
    },
}

/// A user's key-pair-backed capability set.
///
/// An identity is exclusively owned by the session that created it and
/// immutable for the session's lifetime. All operations work on
/// armored strings; key material never crosses this boundary.
pub trait Identity: Send + Sync + 'static {
    /// The `alias@podhost` this identity answers to.
    fn user_id(&self) -> &UserId;

    /// The armored public key bundle, as published under the alias.
    fn public_key_armored(&self) -> &str;

    /// Hex fingerprint of the public key.
    fn fingerprint(&self) -> &str;

    /// Clear-sign a message, returning the armored signed form.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::Sign` on failure.
    fn sign(&self, message: &str) -> Result<String, CryptoError>;

    /// Verify a clear-signed message against a signer's armored public
    /// key, returning the inner text on success.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::Verify` if the signature does not check
    /// out, or `CryptoError::BadKey` if the key is unusable.
    fn verify(&self, signer_key_armored: &str, signed_message: &str) -> Result<String, CryptoError>;

    /// Encrypt a message to the given recipients, returning the
    /// armored envelope.
    ///
    /// The sender's own key is ALWAYS added to the recipient set, so
    /// the sender can re-decrypt their own sent messages later.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::Encrypt` or `CryptoError::BadKey` on
    /// failure.
    fn encrypt(
        &self,
        recipient_keys_armored: &[String],
        message: &str,
    ) -> Result<String, CryptoError>;

    /// Decrypt an armored envelope addressed to this identity,
    /// returning the decrypted content (typically a clear-signed
    /// message).
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::Decrypt` if this identity cannot open the
    /// envelope.
    fn decrypt(&self, armored: &str) -> Result<String, CryptoError>;
}
