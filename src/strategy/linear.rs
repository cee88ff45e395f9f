//! The `Linear` strategy: delay grows by a fixed increment each attempt.

use std::time::Duration;

use crate::duration_math::apply_optional_cap;

use super::{Attempt, Strategy};

/// `delay(n) = min(n * increment, max)` for `n >= 1`; `delay(n <= 0) =
/// increment`. `max == Duration::ZERO` means unbounded.
#[derive(Debug, Clone, Copy)]
pub struct Linear {
    increment: Duration,
    max: Duration,
}

impl Linear {
    /// Build a linear-backoff strategy. `max = Duration::ZERO` disables
    /// the cap.
    pub fn new(increment: Duration, max: Duration) -> Self {
        Self { increment, max }
    }
}

impl Strategy for Linear {
    fn delay(&self, attempt: Attempt) -> Duration {
        if attempt <= 0 {
            return self.increment;
        }
        let n = attempt.min(u32::MAX as i64) as u32;
        let raw = self.increment.saturating_mul(n);
        apply_optional_cap(raw, self.max)
    }

    fn name(&self) -> &'static str {
        "linear"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grows_by_increment() {
        let s = Linear::new(Duration::from_millis(100), Duration::ZERO);
        assert_eq!(s.delay(1), Duration::from_millis(100));
        assert_eq!(s.delay(2), Duration::from_millis(200));
        assert_eq!(s.delay(3), Duration::from_millis(300));
    }

    #[test]
    fn zero_or_negative_attempt_returns_increment() {
        let s = Linear::new(Duration::from_millis(50), Duration::ZERO);
        assert_eq!(s.delay(0), Duration::from_millis(50));
        assert_eq!(s.delay(-3), Duration::from_millis(50));
    }

    #[test]
    fn caps_at_max() {
        let s = Linear::new(Duration::from_millis(100), Duration::from_millis(250));
        assert_eq!(s.delay(1), Duration::from_millis(100));
        assert_eq!(s.delay(2), Duration::from_millis(200));
        assert_eq!(s.delay(3), Duration::from_millis(250));
        assert_eq!(s.delay(100), Duration::from_millis(250));
    }

    #[test]
    fn zero_max_is_unbounded() {
        let s = Linear::new(Duration::from_secs(1), Duration::ZERO);
        assert_eq!(s.delay(1000), Duration::from_secs(1000));
    }
}
