//! Fuzz target for armor classification
//!
//! The storage gate trusts `Armor::classify` to decide what may enter
//! the network; a panic or a misclassification here is an invariant
//! breach.
//!
//! # Strategy
//!
//! - Raw bytes: arbitrary input, valid UTF-8 or not
//! - Frame splicing: real armor headers glued onto arbitrary bodies
//! - Round trips: structurally valid envelopes re-armored and
//!   re-classified
//!
//! # Invariants
//!
//! - NEVER panic on any input
//! - A value classified `Encrypted` re-armors to a value classified
//!   `Encrypted` with identical structure
//! - Classification errors never return the raw value

#![no_main]

use arbitrary::Arbitrary;
use dovecote_proto::{Armor, EncryptedEnvelope, RecipientStanza};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Clone, Arbitrary)]
enum FuzzInput {
    /// Arbitrary bytes, lossily decoded.
    Raw(Vec<u8>),

    /// An armor frame around an arbitrary body.
    Spliced { label_pick: u8, body: Vec<u8> },

    /// A structurally valid envelope built from parts.
    Envelope {
        ephemeral: [u8; 32],
        stanza_count: u8,
        fingerprint_seed: u8,
        nonce: [u8; 24],
        ciphertext: Vec<u8>,
    },
}

fuzz_target!(|input: FuzzInput| {
    match input {
        FuzzInput::Raw(bytes) => {
            let text = String::from_utf8_lossy(&bytes);
            let _ = Armor::classify(&text);
        },

        FuzzInput::Spliced { label_pick, body } => {
            let label = match label_pick % 3 {
                0 => "DOVECOTE ENCRYPTED MESSAGE",
                1 => "DOVECOTE SIGNED MESSAGE",
                _ => "DOVECOTE PUBLIC KEY",
            };
            let text = format!(
                "-----BEGIN {label}-----\n{}\n-----END {label}-----\n",
                String::from_utf8_lossy(&body)
            );
            let _ = Armor::classify(&text);
        },

        FuzzInput::Envelope { ephemeral, stanza_count, fingerprint_seed, nonce, ciphertext } => {
            let recipients = (0..stanza_count % 8)
                .map(|i| RecipientStanza {
                    fingerprint: format!("{:02x}", fingerprint_seed.wrapping_add(i)).repeat(20),
                    nonce,
                    wrapped_key: ciphertext.clone(),
                })
                .collect::<Vec<_>>();

            let envelope = EncryptedEnvelope { ephemeral, recipients, nonce, ciphertext };

            let Ok(armored) = envelope.to_armored() else {
                return;
            };

            match Armor::classify(&armored) {
                Ok(Armor::Encrypted(parsed)) => {
                    assert_eq!(parsed, envelope, "round trip changed the envelope");
                    assert!(!parsed.recipients.is_empty());
                },
                Ok(Armor::ClearSigned(_)) => {
                    panic!("encrypted armor classified as clear-signed");
                },
                Err(_) => {
                    // Only the no-recipients case may reject a
                    // well-formed envelope.
                    assert!(envelope.recipients.is_empty());
                },
            }
        },
    }
});
