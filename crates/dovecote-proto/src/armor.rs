//! ASCII-armored envelope framing.
//!
//! Every blob that crosses a trust boundary in this protocol travels
//! armored: a labeled `-----BEGIN ...-----` / `-----END ...-----`
//! frame around a base64-wrapped CBOR body. Armor inspection is pure
//! parsing: no key material is needed to decide whether a value is an
//! encrypted envelope, a clear-signed message, or neither, which is
//! exactly the question the storage gate has to answer before anything
//! reaches the network.
//!
//! # Envelope kinds
//!
//! - [`EncryptedEnvelope`]: ephemeral-key hybrid encryption to one or
//!   more recipients. A well-formed envelope has at least one
//!   recipient stanza.
//! - [`ClearSignedMessage`]: readable text followed by a detached
//!   signature block.
//! - [`PublicKeyBundle`]: a user's public signing and exchange keys,
//!   as served by `GET /aliases/{alias}`.

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Armor label for encrypted message envelopes.
const ENCRYPTED_LABEL: &str = "DOVECOTE ENCRYPTED MESSAGE";

/// Armor label for clear-signed messages.
const SIGNED_LABEL: &str = "DOVECOTE SIGNED MESSAGE";

/// Armor label for the detached signature inside a clear-signed
/// message.
const SIGNATURE_LABEL: &str = "DOVECOTE SIGNATURE";

/// Armor label for public key bundles.
const PUBLIC_KEY_LABEL: &str = "DOVECOTE PUBLIC KEY";

/// Armor label for passphrase-encrypted secret key bundles.
const SECRET_KEY_LABEL: &str = "DOVECOTE PRIVATE KEY";

/// Column width for base64 body lines.
const WRAP_COLUMNS: usize = 64;

/// Errors from armor parsing and encoding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArmorError {
    /// The input carries no recognized armor frame.
    #[error("value is not an armored envelope")]
    NotArmored,

    /// A frame opened but never closed, or interior structure is
    /// missing.
    #[error("truncated armor block: {label}")]
    Truncated {
        /// Label of the block that was cut short.
        label: String,
    },

    /// Base64 body failed to decode.
    #[error("invalid armor body: {reason}")]
    BadBody {
        /// Decoder's description of the failure.
        reason: String,
    },

    /// CBOR body decoded but did not match the expected structure.
    #[error("malformed envelope: {reason}")]
    Malformed {
        /// Decoder's description of the failure.
        reason: String,
    },

    /// Envelope body could not be encoded.
    #[error("envelope encoding failed: {reason}")]
    Encode {
        /// Encoder's description of the failure.
        reason: String,
    },

    /// An encrypted envelope with no recipient stanzas is unreadable
    /// by anyone and therefore invalid.
    #[error("encrypted envelope has no recipients")]
    NoRecipients,
}

/// One recipient's copy of the content key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipientStanza {
    /// Fingerprint of the recipient key this stanza is wrapped for.
    pub fingerprint: String,

    /// AEAD nonce used for the key wrap.
    pub nonce: [u8; 24],

    /// The content key, wrapped for this recipient.
    pub wrapped_key: Vec<u8>,
}

/// The body of an encrypted message envelope.
///
/// Hybrid construction: an ephemeral exchange key is combined with
/// each recipient's public key to wrap a single content key, and the
/// content key encrypts the payload once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedEnvelope {
    /// Ephemeral public exchange key for this envelope.
    pub ephemeral: [u8; 32],

    /// One stanza per recipient able to open this envelope.
    pub recipients: Vec<RecipientStanza>,

    /// AEAD nonce for the payload.
    pub nonce: [u8; 24],

    /// The encrypted payload.
    pub ciphertext: Vec<u8>,
}

impl EncryptedEnvelope {
    /// Render this envelope as an armored string.
    ///
    /// # Errors
    ///
    /// Returns `ArmorError::Encode` if the body cannot be serialized.
    pub fn to_armored(&self) -> Result<String, ArmorError> {
        encode_block(ENCRYPTED_LABEL, self)
    }

    /// Parse an armored encrypted envelope.
    ///
    /// # Errors
    ///
    /// Returns `ArmorError` if the frame, body, or structure is
    /// invalid, or if the envelope names no recipients.
    pub fn from_armored(text: &str) -> Result<Self, ArmorError> {
        let envelope: Self = decode_block(ENCRYPTED_LABEL, text)?;

        if envelope.recipients.is_empty() {
            return Err(ArmorError::NoRecipients);
        }

        Ok(envelope)
    }
}

/// A detached signature with enough context to verify it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureBlock {
    /// Fingerprint of the signing key.
    pub fingerprint: String,

    /// The public verifying key.
    pub verifying_key: [u8; 32],

    /// Signature over the exact text bytes of the message.
    pub signature: Vec<u8>,
}

/// A clear-signed message: readable text plus a detached signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClearSignedMessage {
    /// The signed text, exactly as signed.
    pub text: String,

    /// Signature over `text`.
    pub signature: SignatureBlock,
}

impl ClearSignedMessage {
    /// Render this message in clear-signed armor.
    ///
    /// # Errors
    ///
    /// Returns `ArmorError::Encode` if the signature block cannot be
    /// serialized.
    pub fn to_armored(&self) -> Result<String, ArmorError> {
        let sig_body = to_cbor(&self.signature)?;

        let mut out = String::new();
        out.push_str(&begin_line(SIGNED_LABEL));
        out.push_str("\n\n");
        out.push_str(&self.text);
        out.push('\n');
        out.push_str(&begin_line(SIGNATURE_LABEL));
        out.push('\n');
        out.push_str(&wrap_base64(&BASE64.encode(sig_body)));
        out.push_str(&end_line(SIGNED_LABEL));
        out.push('\n');

        Ok(out)
    }

    /// Parse a clear-signed armored message.
    ///
    /// # Errors
    ///
    /// Returns `ArmorError` if the frame or signature block is
    /// invalid.
    pub fn from_armored(input: &str) -> Result<Self, ArmorError> {
        let begin = begin_line(SIGNED_LABEL);
        let sig_begin = begin_line(SIGNATURE_LABEL);
        let end = end_line(SIGNED_LABEL);

        let body = input
            .trim_start()
            .strip_prefix(begin.as_str())
            .ok_or(ArmorError::NotArmored)?;

        let sig_at = body.find(sig_begin.as_str()).ok_or_else(|| ArmorError::Truncated {
            label: SIGNED_LABEL.to_string(),
        })?;

        // One blank line separates the header from the text; the text
        // runs up to the newline before the signature frame.
        let text = body[..sig_at]
            .strip_prefix("\n\n")
            .and_then(|t| t.strip_suffix('\n'))
            .ok_or_else(|| ArmorError::Truncated { label: SIGNED_LABEL.to_string() })?;

        let tail = &body[sig_at + sig_begin.len()..];
        let end_at = tail.find(end.as_str()).ok_or_else(|| ArmorError::Truncated {
            label: SIGNATURE_LABEL.to_string(),
        })?;

        let sig_b64: String = tail[..end_at].split_whitespace().collect();
        let sig_bytes = BASE64
            .decode(sig_b64)
            .map_err(|e| ArmorError::BadBody { reason: e.to_string() })?;
        let signature = from_cbor(&sig_bytes)?;

        Ok(Self { text: text.to_string(), signature })
    }
}

/// A user's public key material, as published under their alias.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKeyBundle {
    /// The `alias@podhost` this bundle belongs to.
    pub user_id: String,

    /// Ed25519 verifying key.
    pub signing: [u8; 32],

    /// X25519 exchange key.
    pub exchange: [u8; 32],
}

impl PublicKeyBundle {
    /// Render this bundle as an armored string.
    ///
    /// # Errors
    ///
    /// Returns `ArmorError::Encode` if the body cannot be serialized.
    pub fn to_armored(&self) -> Result<String, ArmorError> {
        encode_block(PUBLIC_KEY_LABEL, self)
    }

    /// Parse an armored public key bundle.
    ///
    /// # Errors
    ///
    /// Returns `ArmorError` if the frame, body, or structure is
    /// invalid.
    pub fn from_armored(text: &str) -> Result<Self, ArmorError> {
        decode_block(PUBLIC_KEY_LABEL, text)
    }
}

/// A passphrase-encrypted secret key bundle, as kept at rest.
///
/// The layout of the decrypted interior is the key owner's business;
/// this type only frames the encrypted blob with its KDF salt and
/// nonce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedKeyBundle {
    /// KDF salt for the passphrase.
    pub salt: [u8; 16],

    /// AEAD nonce.
    pub nonce: [u8; 24],

    /// The encrypted secret key material.
    pub ciphertext: Vec<u8>,
}

impl EncryptedKeyBundle {
    /// Render this bundle as an armored string.
    ///
    /// # Errors
    ///
    /// Returns `ArmorError::Encode` if the body cannot be serialized.
    pub fn to_armored(&self) -> Result<String, ArmorError> {
        encode_block(SECRET_KEY_LABEL, self)
    }

    /// Parse an armored secret key bundle.
    ///
    /// # Errors
    ///
    /// Returns `ArmorError` if the frame, body, or structure is
    /// invalid.
    pub fn from_armored(text: &str) -> Result<Self, ArmorError> {
        decode_block(SECRET_KEY_LABEL, text)
    }
}

/// Classification of an armored value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Armor {
    /// An encrypted message envelope.
    Encrypted(EncryptedEnvelope),

    /// A clear-signed (but NOT encrypted) message.
    ClearSigned(ClearSignedMessage),
}

impl Armor {
    /// Classify a value by its armor frame and validate its structure.
    ///
    /// Plaintext (no armor frame at all) is `ArmorError::NotArmored`;
    /// a recognized frame with a broken body is the corresponding
    /// parse error.
    ///
    /// # Errors
    ///
    /// Returns `ArmorError` for unarmored or structurally invalid
    /// input.
    pub fn classify(value: &str) -> Result<Self, ArmorError> {
        let head = value.trim_start();

        if head.starts_with(begin_line(ENCRYPTED_LABEL).as_str()) {
            return EncryptedEnvelope::from_armored(value).map(Self::Encrypted);
        }
        if head.starts_with(begin_line(SIGNED_LABEL).as_str()) {
            return ClearSignedMessage::from_armored(value).map(Self::ClearSigned);
        }

        Err(ArmorError::NotArmored)
    }

    /// Whether this value is an encrypted envelope.
    pub fn is_encrypted(&self) -> bool {
        matches!(self, Self::Encrypted(_))
    }
}

fn begin_line(label: &str) -> String {
    format!("-----BEGIN {label}-----")
}

fn end_line(label: &str) -> String {
    format!("-----END {label}-----")
}

fn wrap_base64(b64: &str) -> String {
    let mut out = String::with_capacity(b64.len() + b64.len() / WRAP_COLUMNS + 1);
    let bytes = b64.as_bytes();

    for chunk in bytes.chunks(WRAP_COLUMNS) {
        out.push_str(std::str::from_utf8(chunk).unwrap_or_default());
        out.push('\n');
    }

    out
}

fn to_cbor<T: Serialize>(value: &T) -> Result<Vec<u8>, ArmorError> {
    let mut body = Vec::new();
    ciborium::ser::into_writer(value, &mut body)
        .map_err(|e| ArmorError::Encode { reason: e.to_string() })?;
    Ok(body)
}

fn from_cbor<T: for<'de> Deserialize<'de>>(bytes: &[u8]) -> Result<T, ArmorError> {
    ciborium::de::from_reader(bytes).map_err(|e| ArmorError::Malformed { reason: e.to_string() })
}

fn encode_block<T: Serialize>(label: &str, value: &T) -> Result<String, ArmorError> {
    let body = to_cbor(value)?;

    let mut out = String::new();
    out.push_str(&begin_line(label));
    out.push('\n');
    out.push_str(&wrap_base64(&BASE64.encode(body)));
    out.push_str(&end_line(label));
    out.push('\n');

    Ok(out)
}

fn decode_block<T: for<'de> Deserialize<'de>>(label: &str, input: &str) -> Result<T, ArmorError> {
    let begin = begin_line(label);
    let end = end_line(label);

    let body = input
        .trim_start()
        .strip_prefix(begin.as_str())
        .ok_or(ArmorError::NotArmored)?;

    let end_at = body
        .find(end.as_str())
        .ok_or_else(|| ArmorError::Truncated { label: label.to_string() })?;

    let b64: String = body[..end_at].split_whitespace().collect();
    let bytes =
        BASE64.decode(b64).map_err(|e| ArmorError::BadBody { reason: e.to_string() })?;

    from_cbor(&bytes)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample_envelope() -> EncryptedEnvelope {
        EncryptedEnvelope {
            ephemeral: [7u8; 32],
            recipients: vec![RecipientStanza {
                fingerprint: "ab".repeat(20),
                nonce: [1u8; 24],
                wrapped_key: vec![2u8; 48],
            }],
            nonce: [3u8; 24],
            ciphertext: vec![4u8; 100],
        }
    }

    fn sample_signed() -> ClearSignedMessage {
        ClearSignedMessage {
            text: "hello\nworld".to_string(),
            signature: SignatureBlock {
                fingerprint: "cd".repeat(20),
                verifying_key: [9u8; 32],
                signature: vec![5u8; 64],
            },
        }
    }

    #[test]
    fn encrypted_envelope_round_trips() {
        let envelope = sample_envelope();
        let armored = envelope.to_armored().unwrap();
        let parsed = EncryptedEnvelope::from_armored(&armored).unwrap();
        assert_eq!(parsed, envelope);
    }

    #[test]
    fn clear_signed_round_trips() {
        let signed = sample_signed();
        let armored = signed.to_armored().unwrap();
        let parsed = ClearSignedMessage::from_armored(&armored).unwrap();
        assert_eq!(parsed, signed);
    }

    #[test]
    fn public_key_bundle_round_trips() {
        let bundle = PublicKeyBundle {
            user_id: "alice@pod.example".to_string(),
            signing: [11u8; 32],
            exchange: [12u8; 32],
        };
        let armored = bundle.to_armored().unwrap();
        let parsed = PublicKeyBundle::from_armored(&armored).unwrap();
        assert_eq!(parsed, bundle);
    }

    #[test]
    fn classify_encrypted() {
        let armored = sample_envelope().to_armored().unwrap();
        let armor = Armor::classify(&armored).unwrap();
        assert!(armor.is_encrypted());
    }

    #[test]
    fn classify_clear_signed_is_not_encrypted() {
        let armored = sample_signed().to_armored().unwrap();
        let armor = Armor::classify(&armored).unwrap();
        assert!(!armor.is_encrypted());
    }

    #[test]
    fn classify_plaintext_fails() {
        assert_eq!(Armor::classify("just some text"), Err(ArmorError::NotArmored));
    }

    #[test]
    fn envelope_without_recipients_rejected() {
        let mut envelope = sample_envelope();
        envelope.recipients.clear();

        let armored = envelope.to_armored().unwrap();
        assert_eq!(
            EncryptedEnvelope::from_armored(&armored),
            Err(ArmorError::NoRecipients)
        );
    }

    #[test]
    fn truncated_frame_rejected() {
        let armored = sample_envelope().to_armored().unwrap();
        let cut = &armored[..armored.len() / 2];
        assert!(matches!(
            EncryptedEnvelope::from_armored(cut),
            Err(ArmorError::Truncated { .. })
        ));
    }

    #[test]
    fn corrupted_body_rejected() {
        let armored = sample_envelope().to_armored().unwrap();
        let mut lines: Vec<&str> = armored.lines().collect();
        lines[1] = "!!!!not base64!!!!";
        let corrupted = lines.join("\n");

        assert!(matches!(
            EncryptedEnvelope::from_armored(&corrupted),
            Err(ArmorError::BadBody { .. })
        ));
    }

    #[test]
    fn signed_text_preserved_exactly() {
        let signed = sample_signed();
        let armored = signed.to_armored().unwrap();
        let parsed = ClearSignedMessage::from_armored(&armored).unwrap();
        assert_eq!(parsed.text, "hello\nworld");
    }
}
