//! Injectable wall-clock source.
//!
//! Reading "now" directly (`SystemTime::now()`) scattered across the
//! Diophantine predicate, the HTTP-aware reset calculation and the
//! effectiveness tracker's timestamps makes all three non-deterministic
//! under test. Every component that needs "now" takes a `&dyn Clock`
//! instead.

use std::sync::Arc;
use std::time::SystemTime;

/// A source of wall-clock time.
pub trait Clock: Send + Sync {
    /// The current time.
    fn now(&self) -> SystemTime;
}

/// The real system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// A clock that always returns the same instant. Used in tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub SystemTime);

impl Clock for FixedClock {
    fn now(&self) -> SystemTime {
        self.0
    }
}

/// A convenience alias for a shared, cloneable clock handle.
pub type SharedClock = Arc<dyn Clock>;
