//! Injectable randomness source for jittered strategies.
//!
//! Mirrors [`crate::clock::Clock`]: production code draws from a real PRNG,
//! tests inject a seeded one so jittered delays are reproducible.

use std::sync::Mutex;

/// A source of uniform random numbers in `[0, 1)`.
pub trait RandomSource: Send + Sync {
    /// Draw a value uniformly distributed in `[0, 1)`.
    fn uniform(&self) -> f64;
}

/// The default source: a per-instance `fastrand` generator seeded from the
/// monotonic clock, guarded by a mutex so it is safe to share across
/// sessions (see the shared-resource policy for randomised strategies).
pub struct ThreadRandom(Mutex<fastrand::Rng>);

impl ThreadRandom {
    /// Create a new generator seeded from the current time.
    pub fn new() -> Self {
        Self(Mutex::new(fastrand::Rng::new()))
    }
}

impl Default for ThreadRandom {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomSource for ThreadRandom {
    fn uniform(&self) -> f64 {
        self.0.lock().expect("rng mutex poisoned").f64()
    }
}

/// A deterministic source for tests: a `fastrand` generator seeded with a
/// fixed value, so repeated test runs draw the same sequence.
pub struct SeededRandom(Mutex<fastrand::Rng>);

impl SeededRandom {
    /// Create a generator seeded with `seed`.
    pub fn new(seed: u64) -> Self {
        Self(Mutex::new(fastrand::Rng::with_seed(seed)))
    }
}

impl RandomSource for SeededRandom {
    fn uniform(&self) -> f64 {
        self.0.lock().expect("rng mutex poisoned").f64()
    }
}

/// A source that always returns the same value. Useful for pinning down
/// the non-jitter half of a computation in a test.
pub struct ConstantRandom(pub f64);

impl RandomSource for ConstantRandom {
    fn uniform(&self) -> f64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_random_is_reproducible() {
        let a = SeededRandom::new(42);
        let b = SeededRandom::new(42);
        let seq_a: Vec<f64> = (0..10).map(|_| a.uniform()).collect();
        let seq_b: Vec<f64> = (0..10).map(|_| b.uniform()).collect();
        assert_eq!(seq_a, seq_b);
    }

    #[test]
    fn uniform_is_in_unit_range() {
        let rng = SeededRandom::new(7);
        for _ in 0..1000 {
            let u = rng.uniform();
            assert!((0.0..1.0).contains(&u));
        }
    }

    #[test]
    fn constant_random_always_same() {
        let rng = ConstantRandom(0.5);
        assert_eq!(rng.uniform(), 0.5);
        assert_eq!(rng.uniform(), 0.5);
    }
}
