//! Storage gate integration tests with call-count oracles.
//!
//! The fake DHT counts every call that reaches it, so these tests
//! verify not only that invalid pairs fail but that they fail BEFORE
//! any network activity.

use std::sync::Arc;

use dovecote_core::{Identity, StorageGate, message_key_for};
use dovecote_crypto::KeyRing;
use dovecote_harness::MemoryDht;
use dovecote_proto::{MessageKey, UserId};

fn keyring(user_id: &str) -> Arc<KeyRing> {
    let user_id = UserId::parse(user_id).expect("valid user id");
    Arc::new(KeyRing::generate(user_id).expect("keygen"))
}

/// A real encrypted envelope, sealed by one identity to itself.
fn real_ciphertext(ring: &KeyRing, text: &str) -> String {
    let signed = ring.sign(text).expect("sign");
    ring.encrypt(&[], &signed).expect("encrypt")
}

// Oracle: the store holds exactly `expected` values and saw exactly
// `puts` put calls.
fn verify_store(dht: &MemoryDht, puts: usize, key: &MessageKey, expected_present: bool) {
    assert_eq!(dht.put_count(), puts, "unexpected number of put calls");
    assert_eq!(dht.contains(key), expected_present, "unexpected store contents");
}

#[tokio::test]
async fn valid_pair_round_trips_unchanged() {
    let dht = MemoryDht::new();
    let gate = StorageGate::new(dht.clone());

    let alice = keyring("alice@pod.example");
    let value = real_ciphertext(&alice, "round trip");
    let key = message_key_for(&value);

    gate.put(&key, &value).await.expect("gated put");
    let fetched = gate.get(&key).await.expect("gated get");

    assert_eq!(fetched, value);
    verify_store(&dht, 1, &key, true);
}

#[tokio::test]
async fn mismatched_key_fails_before_network() {
    let dht = MemoryDht::new();
    let gate = StorageGate::new(dht.clone());

    let alice = keyring("alice@pod.example");
    let value = real_ciphertext(&alice, "mismatch");
    let wrong = MessageKey::parse(&"0".repeat(40)).expect("valid key syntax");

    assert!(gate.put(&wrong, &value).await.is_err());
    verify_store(&dht, 0, &wrong, false);
}

#[tokio::test]
async fn signed_only_value_fails_before_network() {
    let dht = MemoryDht::new();
    let gate = StorageGate::new(dht.clone());

    let alice = keyring("alice@pod.example");
    let signed = alice.sign("signed but readable").expect("sign");
    let key = message_key_for(&signed);

    assert!(gate.put(&key, &signed).await.is_err());
    verify_store(&dht, 0, &key, false);
}

#[tokio::test]
async fn peer_planted_plaintext_never_escapes_the_gate() {
    let dht = MemoryDht::new();
    let gate = StorageGate::new(dht.clone());

    // A compromised peer plants plaintext under its correct digest.
    let plaintext = "leaked in the clear";
    let key = message_key_for(plaintext);
    dht.insert_raw(key.as_str(), plaintext);

    let result = gate.get(&key).await;
    assert!(result.is_err(), "the gate must return the error, not the value");
}

#[tokio::test]
async fn peer_substituted_value_never_escapes_the_gate() {
    let dht = MemoryDht::new();
    let gate = StorageGate::new(dht.clone());

    let alice = keyring("alice@pod.example");
    let original = real_ciphertext(&alice, "original");
    let substitute = real_ciphertext(&alice, "substitute");
    let key = message_key_for(&original);

    // The peer answers the original's key with a different envelope.
    dht.insert_raw(key.as_str(), &substitute);

    let result = gate.get(&key).await;
    assert!(result.is_err(), "a substituted value must fail key validation");
}
