//! Environment abstraction for deterministic testing.
//!
//! Decouples session logic from system resources (time, randomness). The
//! store uses randomness for correlation and request ids, and time for
//! typing-expiry deadlines; both must be virtualizable so the same code runs
//! in production and in seeded simulation.

use std::time::Duration;

/// Abstract environment providing time and randomness.
///
/// Implementations MUST guarantee:
///
/// - `now()` never goes backwards within one execution context
/// - `random_bytes()` draws from a seeded generator in simulation so runs
///   are reproducible
pub trait Environment: Clone + Send + Sync + 'static {
    /// The specific instant type used by this environment.
    ///
    /// Production environments use `std::time::Instant`; simulation
    /// environments use virtual time.
    type Instant: Copy + Ord + Send + Sync + std::ops::Sub<Output = Duration>;

    /// Current time (monotonic).
    fn now(&self) -> Self::Instant;

    /// Sleep for the given duration.
    ///
    /// Only driver code awaits this; state machines take time as input.
    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send;

    /// Fill the buffer with random bytes.
    fn random_bytes(&self, buffer: &mut [u8]);

    /// Generate a random `u64`.
    ///
    /// Convenience for correlation ids, request ids, and handle ids.
    fn random_u64(&self) -> u64 {
        let mut bytes = [0u8; 8];
        self.random_bytes(&mut bytes);
        u64::from_be_bytes(bytes)
    }
}

/// Production environment backed by the system clock and OS entropy.
///
/// Uses `std::time::Instant::now()` for time, `tokio::time::sleep()` for
/// async sleeping, and getrandom for OS randomness.
///
/// # Panics
///
/// `random_bytes` panics if the OS RNG fails. Correlation and request ids
/// cannot be generated without entropy, and an RNG failure indicates an
/// OS-level problem the client cannot recover from.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnv;

impl Environment for SystemEnv {
    type Instant = std::time::Instant;

    fn now(&self) -> Self::Instant {
        std::time::Instant::now()
    }

    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }

    #[allow(clippy::expect_used)]
    fn random_bytes(&self, buffer: &mut [u8]) {
        getrandom::fill(buffer).expect("invariant: OS RNG failure is unrecoverable");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    };

    use super::*;

    #[test]
    fn random_u64_varies_across_draws() {
        let a = SystemEnv.random_u64();
        let b = SystemEnv.random_u64();
        // Equal draws are astronomically unlikely; treat as failure.
        assert_ne!(a, b);
    }

    #[test]
    fn random_bytes_fills_buffer() {
        let mut bytes = [0u8; 64];
        SystemEnv.random_bytes(&mut bytes);
        let non_zero = bytes.iter().filter(|&&b| b != 0).count();
        assert!(non_zero > 32, "most bytes should be non-zero");
    }

    #[tokio::test]
    async fn sleep_waits_at_least_the_requested_duration() {
        let env = SystemEnv;
        let start = env.now();
        env.sleep(Duration::from_millis(50)).await;
        assert!(env.now() - start >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn sleep_yields_to_other_tasks() {
        // On a current-thread runtime a blocking sleep would starve every
        // other task; a cooperative timer lets them run.
        let env = SystemEnv;
        let ran = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&ran);
        let side = tokio::spawn(async move {
            flag.store(true, Ordering::Relaxed);
        });
        env.sleep(Duration::from_millis(50)).await;
        assert!(ran.load(Ordering::Relaxed), "side task starved during sleep");
        side.await.expect("side task");
    }
}
