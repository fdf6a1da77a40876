//! Armored clearsigning.

use dovecote_core::CryptoError;
use dovecote_proto::{ClearSignedMessage, SignatureBlock};
use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};

/// Clear-sign `text`, returning the armored signed form.
///
/// # Errors
///
/// Returns `CryptoError::Sign` if the armor cannot be rendered.
pub fn sign_text(
    signing: &SigningKey,
    fingerprint: &str,
    text: &str,
) -> Result<String, CryptoError> {
    let signature = signing.sign(text.as_bytes());

    let message = ClearSignedMessage {
        text: text.to_string(),
        signature: SignatureBlock {
            fingerprint: fingerprint.to_string(),
            verifying_key: signing.verifying_key().to_bytes(),
            signature: signature.to_bytes().to_vec(),
        },
    };

    message.to_armored().map_err(|e| CryptoError::Sign { reason: e.to_string() })
}

/// Verify an armored clear-signed message against an expected key,
/// returning the inner text.
///
/// The key embedded in the signature block is convenience metadata; it
/// must match the caller's expected key or verification fails before
/// any signature math happens.
///
/// # Errors
///
/// Returns `CryptoError::Verify` if the armor is broken, the embedded
/// key differs from `expected`, or the signature does not check out.
pub fn verify_text(expected: &VerifyingKey, signed_message: &str) -> Result<String, CryptoError> {
    let message = ClearSignedMessage::from_armored(signed_message)
        .map_err(|e| CryptoError::Verify { reason: e.to_string() })?;

    if message.signature.verifying_key != expected.to_bytes() {
        return Err(CryptoError::Verify {
            reason: "message signed by a different key".to_string(),
        });
    }

    let signature = Signature::from_slice(&message.signature.signature)
        .map_err(|e| CryptoError::Verify { reason: e.to_string() })?;

    expected
        .verify_strict(message.text.as_bytes(), &signature)
        .map_err(|e| CryptoError::Verify { reason: e.to_string() })?;

    Ok(message.text)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::rngs::OsRng;

    use super::*;

    #[test]
    fn sign_verify_round_trip() {
        let key = SigningKey::generate(&mut OsRng);
        let signed = sign_text(&key, "fp", "attack at dawn").unwrap();

        let text = verify_text(&key.verifying_key(), &signed).unwrap();
        assert_eq!(text, "attack at dawn");
    }

    #[test]
    fn wrong_key_rejected() {
        let key = SigningKey::generate(&mut OsRng);
        let other = SigningKey::generate(&mut OsRng);

        let signed = sign_text(&key, "fp", "attack at dawn").unwrap();
        let result = verify_text(&other.verifying_key(), &signed);

        assert!(matches!(result, Err(CryptoError::Verify { .. })));
    }

    #[test]
    fn tampered_text_rejected() {
        let key = SigningKey::generate(&mut OsRng);
        let signed = sign_text(&key, "fp", "attack at dawn").unwrap();
        let tampered = signed.replace("dawn", "dusk");

        let result = verify_text(&key.verifying_key(), &tampered);
        assert!(matches!(result, Err(CryptoError::Verify { .. })));
    }

    #[test]
    fn signed_form_is_armored() {
        let key = SigningKey::generate(&mut OsRng);
        let signed = sign_text(&key, "fp", "hello").unwrap();
        assert!(signed.starts_with("-----BEGIN DOVECOTE SIGNED MESSAGE-----"));
        assert!(signed.contains("hello"));
    }
}
