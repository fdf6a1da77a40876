//! The key ring: a generated identity and its capability surface.

use chacha20poly1305::{
    Key, XChaCha20Poly1305, XNonce,
    aead::{Aead, KeyInit},
};
use dovecote_core::{CryptoError, Identity};
use dovecote_proto::{EncryptedKeyBundle, PublicKeyBundle, UserId};
use ed25519_dalek::{SigningKey, VerifyingKey};
use hkdf::Hkdf;
use rand::{RngCore, rngs::OsRng};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use x25519_dalek::{PublicKey as ExchangePublic, StaticSecret};

use crate::{
    clearsign::{sign_text, verify_text},
    envelope::{open, seal},
    fingerprint::fingerprint_bytes,
};

/// HKDF info label for the secret-bundle passphrase key.
const EXPORT_INFO: &[u8] = b"dovecote secret key export v1";

/// Serialized interior of an exported secret bundle.
#[derive(Serialize, Deserialize)]
struct SecretParts {
    user_id: String,
    signing: [u8; 32],
    exchange: [u8; 32],
}

/// A user's key pair and identifier.
///
/// Exclusively owned by the session that created it; immutable for the
/// session's lifetime. The armored public bundle and the fingerprint
/// are computed once at construction.
pub struct KeyRing {
    user_id: UserId,
    signing: SigningKey,
    exchange: StaticSecret,
    public_armored: String,
    fingerprint: String,
}

impl KeyRing {
    /// Generate a fresh key ring for `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::Sign` if the public bundle cannot be
    /// rendered (which would make the identity unpublishable).
    pub fn generate(user_id: UserId) -> Result<Self, CryptoError> {
        let signing = SigningKey::generate(&mut OsRng);
        let exchange = StaticSecret::random_from_rng(OsRng);

        Self::from_parts(user_id, signing, exchange)
    }

    fn from_parts(
        user_id: UserId,
        signing: SigningKey,
        exchange: StaticSecret,
    ) -> Result<Self, CryptoError> {
        let bundle = PublicKeyBundle {
            user_id: user_id.as_str().to_string(),
            signing: signing.verifying_key().to_bytes(),
            exchange: ExchangePublic::from(&exchange).to_bytes(),
        };

        let fingerprint = fingerprint_bytes(&bundle.signing, &bundle.exchange);
        let public_armored =
            bundle.to_armored().map_err(|e| CryptoError::Sign { reason: e.to_string() })?;

        Ok(Self { user_id, signing, exchange, public_armored, fingerprint })
    }

    /// The public key bundle for this identity.
    pub fn public_bundle(&self) -> Result<PublicKeyBundle, CryptoError> {
        PublicKeyBundle::from_armored(&self.public_armored)
            .map_err(|e| CryptoError::BadKey { reason: e.to_string() })
    }

    /// Export the secret key material, encrypted under a passphrase.
    ///
    /// The passphrase is stretched with HKDF-SHA256 over a random
    /// salt; it is not a memory-hard KDF, so passphrases must be
    /// high-entropy.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::Encrypt` if serialization or encryption
    /// fails.
    pub fn export_secret(&self, passphrase: &str) -> Result<String, CryptoError> {
        let parts = SecretParts {
            user_id: self.user_id.as_str().to_string(),
            signing: self.signing.to_bytes(),
            exchange: self.exchange.to_bytes(),
        };

        let mut interior = Vec::new();
        ciborium::ser::into_writer(&parts, &mut interior)
            .map_err(|e| CryptoError::Encrypt { reason: e.to_string() })?;

        let mut salt = [0u8; 16];
        OsRng.fill_bytes(&mut salt);
        let key = passphrase_key(passphrase, &salt)?;

        let mut nonce = [0u8; 24];
        OsRng.fill_bytes(&mut nonce);

        let ciphertext = XChaCha20Poly1305::new(Key::from_slice(&key))
            .encrypt(XNonce::from_slice(&nonce), interior.as_slice())
            .map_err(|e| CryptoError::Encrypt { reason: e.to_string() })?;

        EncryptedKeyBundle { salt, nonce, ciphertext }
            .to_armored()
            .map_err(|e| CryptoError::Encrypt { reason: e.to_string() })
    }

    /// Import a secret bundle previously produced by
    /// [`Self::export_secret`].
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::Decrypt` for a wrong passphrase or
    /// corrupted bundle, and `CryptoError::BadKey` if the interior is
    /// structurally invalid.
    pub fn import_secret(armored: &str, passphrase: &str) -> Result<Self, CryptoError> {
        let bundle = EncryptedKeyBundle::from_armored(armored)
            .map_err(|e| CryptoError::Decrypt { reason: e.to_string() })?;

        let key = passphrase_key(passphrase, &bundle.salt)?;

        let interior = XChaCha20Poly1305::new(Key::from_slice(&key))
            .decrypt(XNonce::from_slice(&bundle.nonce), bundle.ciphertext.as_slice())
            .map_err(|_| CryptoError::Decrypt {
                reason: "wrong passphrase or corrupted bundle".to_string(),
            })?;

        let parts: SecretParts = ciborium::de::from_reader(interior.as_slice())
            .map_err(|e| CryptoError::BadKey { reason: e.to_string() })?;

        let user_id = UserId::parse(&parts.user_id)
            .map_err(|e| CryptoError::BadKey { reason: e.to_string() })?;

        Self::from_parts(
            user_id,
            SigningKey::from_bytes(&parts.signing),
            StaticSecret::from(parts.exchange),
        )
    }
}

impl Identity for KeyRing {
    fn user_id(&self) -> &UserId {
        &self.user_id
    }

    fn public_key_armored(&self) -> &str {
        &self.public_armored
    }

    fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    fn sign(&self, message: &str) -> Result<String, CryptoError> {
        sign_text(&self.signing, &self.fingerprint, message)
    }

    fn verify(
        &self,
        signer_key_armored: &str,
        signed_message: &str,
    ) -> Result<String, CryptoError> {
        let bundle = PublicKeyBundle::from_armored(signer_key_armored)
            .map_err(|e| CryptoError::BadKey { reason: e.to_string() })?;

        let verifying = VerifyingKey::from_bytes(&bundle.signing)
            .map_err(|e| CryptoError::BadKey { reason: e.to_string() })?;

        verify_text(&verifying, signed_message)
    }

    fn encrypt(
        &self,
        recipient_keys_armored: &[String],
        message: &str,
    ) -> Result<String, CryptoError> {
        let mut bundles = Vec::with_capacity(recipient_keys_armored.len() + 1);

        for armored in recipient_keys_armored {
            bundles.push(
                PublicKeyBundle::from_armored(armored)
                    .map_err(|e| CryptoError::BadKey { reason: e.to_string() })?,
            );
        }

        // The sender always gets a stanza, so sent messages stay
        // readable to their author.
        bundles.push(self.public_bundle()?);

        seal(&bundles, message.as_bytes())
    }

    fn decrypt(&self, armored: &str) -> Result<String, CryptoError> {
        let payload = open(&self.exchange, &self.fingerprint, armored)?;

        String::from_utf8(payload)
            .map_err(|e| CryptoError::Decrypt { reason: e.to_string() })
    }
}

/// Derive the passphrase key for secret-bundle encryption.
fn passphrase_key(passphrase: &str, salt: &[u8]) -> Result<[u8; 32], CryptoError> {
    let mut key = [0u8; 32];
    Hkdf::<Sha256>::new(Some(salt), passphrase.as_bytes())
        .expand(EXPORT_INFO, &mut key)
        .map_err(|e| CryptoError::Encrypt { reason: e.to_string() })?;
    Ok(key)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn ring(user_id: &str) -> KeyRing {
        KeyRing::generate(UserId::parse(user_id).unwrap()).unwrap()
    }

    #[test]
    fn generate_publishes_parseable_bundle() {
        let alice = ring("alice@pod.example");

        let bundle = PublicKeyBundle::from_armored(alice.public_key_armored()).unwrap();
        assert_eq!(bundle.user_id, "alice@pod.example");
        assert_eq!(alice.fingerprint().len(), 64);
    }

    #[test]
    fn sign_then_verify_with_published_key() {
        let alice = ring("alice@pod.example");
        let bob = ring("bob@pod.example");

        let signed = alice.sign("hello bob").unwrap();
        let text = bob.verify(alice.public_key_armored(), &signed).unwrap();

        assert_eq!(text, "hello bob");
    }

    #[test]
    fn encrypt_includes_sender_stanza() {
        let alice = ring("alice@pod.example");
        let bob = ring("bob@pod.example");

        let armored = alice
            .encrypt(&[bob.public_key_armored().to_string()], "for bob")
            .unwrap();

        // Both the recipient and the sender can open it.
        assert_eq!(bob.decrypt(&armored).unwrap(), "for bob");
        assert_eq!(alice.decrypt(&armored).unwrap(), "for bob");
    }

    #[test]
    fn third_party_cannot_decrypt() {
        let alice = ring("alice@pod.example");
        let bob = ring("bob@pod.example");
        let eve = ring("eve@pod.example");

        let armored = alice
            .encrypt(&[bob.public_key_armored().to_string()], "private")
            .unwrap();

        assert!(matches!(eve.decrypt(&armored), Err(CryptoError::Decrypt { .. })));
    }

    #[test]
    fn export_import_round_trip() {
        let alice = ring("alice@pod.example");
        let exported = alice.export_secret("correct horse battery staple").unwrap();

        let restored = KeyRing::import_secret(&exported, "correct horse battery staple").unwrap();

        assert_eq!(restored.user_id().as_str(), "alice@pod.example");
        assert_eq!(restored.fingerprint(), alice.fingerprint());

        // The restored ring can still open envelopes sealed for the
        // original.
        let bob = ring("bob@pod.example");
        let armored = bob
            .encrypt(&[alice.public_key_armored().to_string()], "wb alice")
            .unwrap();
        assert_eq!(restored.decrypt(&armored).unwrap(), "wb alice");
    }

    #[test]
    fn wrong_passphrase_rejected() {
        let alice = ring("alice@pod.example");
        let exported = alice.export_secret("right").unwrap();

        let result = KeyRing::import_secret(&exported, "wrong");
        assert!(matches!(result, Err(CryptoError::Decrypt { .. })));
    }

    #[test]
    fn malformed_recipient_key_rejected() {
        let alice = ring("alice@pod.example");

        let result = alice.encrypt(&["garbage".to_string()], "msg");
        assert!(matches!(result, Err(CryptoError::BadKey { .. })));
    }
}
