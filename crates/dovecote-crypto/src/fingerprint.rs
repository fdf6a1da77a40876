//! Key fingerprints.

use dovecote_proto::PublicKeyBundle;
use sha2::{Digest, Sha256};

/// Hex fingerprint of a public key bundle.
///
/// The fingerprint covers both the signing and the exchange key, so
/// substituting either one changes the identity.
pub fn fingerprint_of(bundle: &PublicKeyBundle) -> String {
    fingerprint_bytes(&bundle.signing, &bundle.exchange)
}

/// Hex fingerprint over raw key bytes.
pub(crate) fn fingerprint_bytes(signing: &[u8; 32], exchange: &[u8; 32]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(signing);
    hasher.update(exchange);
    hex::encode(hasher.finalize())
}
