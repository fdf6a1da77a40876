//! Environment abstraction for deterministic testing.
//!
//! The `Environment` trait decouples protocol logic from system
//! resources (wall-clock time, randomness). Production code plugs in
//! the system clock and OS entropy; tests plug in fixed or scripted
//! values and get perfectly reproducible nonce sequences.
//!
//! # Invariants
//!
//! - Monotonicity: `now_unix_ms()` must never go backwards within one
//!   execution context
//! - Determinism: test implementations produce the same sequence given
//!   the same setup
//! - Isolation: implementations must not share hidden global state

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

/// Abstract environment providing time and randomness.
///
/// # Safety
///
/// Implementations MUST guarantee:
///
/// 1. Time monotonicity: `now_unix_ms()` never decreases
/// 2. RNG quality: `random_bytes()` uses cryptographically secure
///    entropy in production
pub trait Environment: Clone + Send + Sync + 'static {
    /// Current wall-clock time in milliseconds since the Unix epoch.
    ///
    /// Wall-clock (not a monotonic instant) because the value is used
    /// as a request nonce that remote pods compare across requests and
    /// process restarts.
    fn now_unix_ms(&self) -> u64;

    /// Fills the provided buffer with random bytes.
    ///
    /// Production implementations MUST use OS entropy
    /// (`getrandom`-backed); test implementations may be seeded.
    fn random_bytes(&self, buffer: &mut [u8]);
}

/// Strictly increasing nonce source.
///
/// Nonces start from wall-clock milliseconds but are forced strictly
/// increasing per process: if two requests land in the same
/// millisecond (or the clock steps backwards), the counter advances
/// past the previous value instead of repeating it. A repeated nonce
/// would let a pod reject a legitimate request as a replay.
#[derive(Debug, Clone)]
pub struct NonceSource<E> {
    env: E,
    last: Arc<AtomicU64>,
}

impl<E: Environment> NonceSource<E> {
    /// Create a nonce source over the given environment.
    pub fn new(env: E) -> Self {
        Self { env, last: Arc::new(AtomicU64::new(0)) }
    }

    /// Produce the next nonce: `max(now_ms, previous + 1)`.
    pub fn next(&self) -> u64 {
        let now = self.env.now_unix_ms();
        let mut prev = self.last.load(Ordering::SeqCst);

        loop {
            let next = now.max(prev + 1);
            match self.last.compare_exchange(prev, next, Ordering::SeqCst, Ordering::SeqCst) {
                Ok(_) => return next,
                Err(actual) => prev = actual,
            }
        }
    }
}
