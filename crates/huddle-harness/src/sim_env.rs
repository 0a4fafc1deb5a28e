//! Seeded, virtual-time environment for deterministic simulation.

use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use huddle_core::Environment;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Deterministic environment: virtual clock plus a seeded RNG.
///
/// Clones share the same clock and RNG stream, so every component of a
/// simulated session observes one timeline and one random sequence. The
/// same seed reproduces the same run.
#[derive(Clone)]
pub struct SimEnv {
    clock: Arc<Mutex<Duration>>,
    rng: Arc<Mutex<ChaCha8Rng>>,
}

impl SimEnv {
    /// Environment seeded with zero.
    pub fn new() -> Self {
        Self::with_seed(0)
    }

    /// Environment with an explicit seed for reproducing a failing run.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            clock: Arc::new(Mutex::new(Duration::ZERO)),
            rng: Arc::new(Mutex::new(ChaCha8Rng::seed_from_u64(seed))),
        }
    }

    /// Advance virtual time.
    pub fn advance(&self, by: Duration) {
        *lock(&self.clock) += by;
    }

    /// Virtual time elapsed since the start of the run.
    pub fn elapsed(&self) -> Duration {
        *lock(&self.clock)
    }
}

impl Default for SimEnv {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment for SimEnv {
    type Instant = Duration;

    fn now(&self) -> Duration {
        *lock(&self.clock)
    }

    async fn sleep(&self, duration: Duration) {
        // Virtual sleep: advance the shared clock instead of waiting.
        self.advance(duration);
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        lock(&self.rng).fill_bytes(buffer);
    }
}
