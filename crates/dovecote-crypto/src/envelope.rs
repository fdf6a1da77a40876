//! Multi-recipient envelope encryption.
//!
//! Hybrid construction: one random content key encrypts the payload
//! with XChaCha20-Poly1305; an ephemeral X25519 key agreement with
//! each recipient derives (via HKDF-SHA256) an independent wrap key
//! for that recipient's copy of the content key.

use chacha20poly1305::{
    Key, XChaCha20Poly1305, XNonce,
    aead::{Aead, KeyInit},
};
use dovecote_core::CryptoError;
use dovecote_proto::{EncryptedEnvelope, PublicKeyBundle, RecipientStanza};
use hkdf::Hkdf;
use rand::{RngCore, rngs::OsRng};
use sha2::Sha256;
use x25519_dalek::{PublicKey as ExchangePublic, ReusableSecret, StaticSecret};

use crate::fingerprint::fingerprint_of;

/// HKDF info label for envelope key wrap (domain separation).
const WRAP_INFO: &[u8] = b"dovecote envelope key wrap v1";

/// Size of the content key in bytes.
const CONTENT_KEY_SIZE: usize = 32;

/// Seal `message` for the given recipients, returning the armored
/// envelope.
///
/// Duplicate recipients (same fingerprint) get a single stanza.
///
/// # Errors
///
/// Returns `CryptoError::Encrypt` if the recipient set is empty or
/// any cryptographic step fails.
pub fn seal(recipients: &[PublicKeyBundle], message: &[u8]) -> Result<String, CryptoError> {
    if recipients.is_empty() {
        return Err(CryptoError::Encrypt { reason: "no recipients".to_string() });
    }

    let ephemeral = ReusableSecret::random_from_rng(OsRng);
    let ephemeral_public = ExchangePublic::from(&ephemeral);

    let mut content_key = [0u8; CONTENT_KEY_SIZE];
    OsRng.fill_bytes(&mut content_key);

    let mut payload_nonce = [0u8; 24];
    OsRng.fill_bytes(&mut payload_nonce);

    let ciphertext = XChaCha20Poly1305::new(Key::from_slice(&content_key))
        .encrypt(XNonce::from_slice(&payload_nonce), message)
        .map_err(|e| CryptoError::Encrypt { reason: e.to_string() })?;

    let mut stanzas: Vec<RecipientStanza> = Vec::with_capacity(recipients.len());

    for bundle in recipients {
        let fingerprint = fingerprint_of(bundle);
        if stanzas.iter().any(|s| s.fingerprint == fingerprint) {
            continue;
        }

        let their_key = ExchangePublic::from(bundle.exchange);
        let shared = ephemeral.diffie_hellman(&their_key);
        let wrap_key = derive_wrap_key(ephemeral_public.as_bytes(), shared.as_bytes())?;

        let mut stanza_nonce = [0u8; 24];
        OsRng.fill_bytes(&mut stanza_nonce);

        let wrapped_key = XChaCha20Poly1305::new(Key::from_slice(&wrap_key))
            .encrypt(XNonce::from_slice(&stanza_nonce), content_key.as_slice())
            .map_err(|e| CryptoError::Encrypt { reason: e.to_string() })?;

        stanzas.push(RecipientStanza { fingerprint, nonce: stanza_nonce, wrapped_key });
    }

    let envelope = EncryptedEnvelope {
        ephemeral: ephemeral_public.to_bytes(),
        recipients: stanzas,
        nonce: payload_nonce,
        ciphertext,
    };

    envelope.to_armored().map_err(|e| CryptoError::Encrypt { reason: e.to_string() })
}

/// Open an armored envelope with the given exchange secret, returning
/// the payload bytes.
///
/// The stanza matching `own_fingerprint` is tried first; if the
/// envelope lies about fingerprints, the remaining stanzas are tried
/// anyway, since the wrap key, not the label, is what actually admits
/// a recipient.
///
/// # Errors
///
/// Returns `CryptoError::Decrypt` if the envelope is malformed or no
/// stanza opens with this key.
pub fn open(
    exchange: &StaticSecret,
    own_fingerprint: &str,
    armored: &str,
) -> Result<Vec<u8>, CryptoError> {
    let envelope = EncryptedEnvelope::from_armored(armored)
        .map_err(|e| CryptoError::Decrypt { reason: e.to_string() })?;

    let ephemeral_public = ExchangePublic::from(envelope.ephemeral);
    let shared = exchange.diffie_hellman(&ephemeral_public);
    let wrap_key = derive_wrap_key(&envelope.ephemeral, shared.as_bytes())?;
    let cipher = XChaCha20Poly1305::new(Key::from_slice(&wrap_key));

    let ordered = envelope
        .recipients
        .iter()
        .filter(|s| s.fingerprint == own_fingerprint)
        .chain(envelope.recipients.iter().filter(|s| s.fingerprint != own_fingerprint));

    for stanza in ordered {
        let Ok(content_key) =
            cipher.decrypt(XNonce::from_slice(&stanza.nonce), stanza.wrapped_key.as_slice())
        else {
            continue;
        };

        if content_key.len() != CONTENT_KEY_SIZE {
            continue;
        }

        let mut key = [0u8; CONTENT_KEY_SIZE];
        key.copy_from_slice(&content_key);

        return XChaCha20Poly1305::new(Key::from_slice(&key))
            .decrypt(XNonce::from_slice(&envelope.nonce), envelope.ciphertext.as_slice())
            .map_err(|e| CryptoError::Decrypt { reason: e.to_string() });
    }

    Err(CryptoError::Decrypt { reason: "no stanza addressed to this key".to_string() })
}

/// Derive a recipient's wrap key from the shared secret.
fn derive_wrap_key(salt: &[u8], shared: &[u8]) -> Result<[u8; 32], CryptoError> {
    let mut wrap_key = [0u8; 32];
    Hkdf::<Sha256>::new(Some(salt), shared)
        .expand(WRAP_INFO, &mut wrap_key)
        .map_err(|e| CryptoError::Encrypt { reason: e.to_string() })?;
    Ok(wrap_key)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn party(user_id: &str) -> (StaticSecret, PublicKeyBundle) {
        let exchange = StaticSecret::random_from_rng(OsRng);
        let bundle = PublicKeyBundle {
            user_id: user_id.to_string(),
            signing: [0u8; 32],
            exchange: ExchangePublic::from(&exchange).to_bytes(),
        };
        (exchange, bundle)
    }

    #[test]
    fn seal_open_round_trip() {
        let (secret, bundle) = party("alice@pod.example");
        let fp = fingerprint_of(&bundle);

        let armored = seal(&[bundle], b"hi bob").unwrap();
        let payload = open(&secret, &fp, &armored).unwrap();

        assert_eq!(payload, b"hi bob");
    }

    #[test]
    fn every_recipient_can_open() {
        let (alice_secret, alice) = party("alice@pod.example");
        let (bob_secret, bob) = party("bob@pod.example");

        let armored = seal(&[alice.clone(), bob.clone()], b"to both").unwrap();

        assert_eq!(open(&alice_secret, &fingerprint_of(&alice), &armored).unwrap(), b"to both");
        assert_eq!(open(&bob_secret, &fingerprint_of(&bob), &armored).unwrap(), b"to both");
    }

    #[test]
    fn outsider_cannot_open() {
        let (_, alice) = party("alice@pod.example");
        let (eve_secret, eve) = party("eve@pod.example");

        let armored = seal(&[alice], b"private").unwrap();
        let result = open(&eve_secret, &fingerprint_of(&eve), &armored);

        assert!(matches!(result, Err(CryptoError::Decrypt { .. })));
    }

    #[test]
    fn duplicate_recipients_get_one_stanza() {
        let (_, alice) = party("alice@pod.example");

        let armored = seal(&[alice.clone(), alice], b"once").unwrap();
        let envelope = EncryptedEnvelope::from_armored(&armored).unwrap();

        assert_eq!(envelope.recipients.len(), 1);
    }

    #[test]
    fn empty_recipient_set_rejected() {
        let result = seal(&[], b"nobody");
        assert!(matches!(result, Err(CryptoError::Encrypt { .. })));
    }

    #[test]
    fn tampered_ciphertext_rejected() {
        let (secret, bundle) = party("alice@pod.example");
        let fp = fingerprint_of(&bundle);

        let armored = seal(&[bundle], b"hi").unwrap();
        let mut envelope = EncryptedEnvelope::from_armored(&armored).unwrap();
        if let Some(byte) = envelope.ciphertext.first_mut() {
            *byte = byte.wrapping_add(1);
        }
        let tampered = envelope.to_armored().unwrap();

        let result = open(&secret, &fp, &tampered);
        assert!(matches!(result, Err(CryptoError::Decrypt { .. })));
    }
}
