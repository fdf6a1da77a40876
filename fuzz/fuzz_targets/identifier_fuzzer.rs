//! Fuzz target for identifier parsing
//!
//! User IDs and message keys are validated synchronously before any
//! network call; the parsers must never panic and must never accept a
//! value violating their invariants.
//!
//! # Invariants
//!
//! - NEVER panic on any input
//! - An accepted user ID has exactly one `@` with non-empty alias and
//!   host, and `alias()` + `@` + `pod_host()` reconstructs the input
//! - An accepted message key is exactly 40 lowercase hex characters

#![no_main]

use dovecote_proto::{MessageKey, UserId};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);

    if let Ok(user_id) = UserId::parse(&text) {
        assert!(!user_id.alias().is_empty());
        assert!(!user_id.pod_host().is_empty());
        assert_eq!(
            format!("{}@{}", user_id.alias(), user_id.pod_host()),
            user_id.as_str(),
            "accepted user id does not reconstruct"
        );
        assert_eq!(user_id.as_str().matches('@').count(), 1);
    }

    if let Ok(key) = MessageKey::parse(&text) {
        assert_eq!(key.as_str().len(), 40);
        assert!(key.as_str().bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')));
    }
});
