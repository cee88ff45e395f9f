//! The `Polynomial` strategy: delay grows as `n` raised to a configurable
//! exponent.

use std::time::Duration;

use crate::duration_math::duration_from_secs_f64_saturating;
use crate::error::{PatienceError, Result};

use super::{Attempt, Strategy};

/// `delay(n) = min(base * n^exponent, max)` for `n >= 1`; `delay(n <= 0)
/// = base`.
///
/// Unlike [`Linear`](super::Linear), [`Exponential`](super::Exponential)
/// and [`Fibonacci`](super::Fibonacci), `max` here is not a `0`-means-
/// unbounded sentinel: construction fails outright if `max` is not a
/// strictly positive duration greater than or equal to `base`, since an
/// unbounded polynomial cap was never a case the source described.
#[derive(Debug, Clone, Copy)]
pub struct Polynomial {
    base: Duration,
    exponent: f64,
    max: Duration,
}

impl Polynomial {
    /// Build a polynomial-backoff strategy.
    ///
    /// Fails if `base <= 0`, `exponent < 0`, `max <= 0`, or `base > max`.
    pub fn new(base: Duration, exponent: f64, max: Duration) -> Result<Self> {
        if base.is_zero() {
            return Err(PatienceError::Configuration(
                "polynomial base must be greater than zero".into(),
            ));
        }
        if !exponent.is_finite() || exponent < 0.0 {
            return Err(PatienceError::Configuration(
                "polynomial exponent must be non-negative".into(),
            ));
        }
        if max.is_zero() {
            return Err(PatienceError::Configuration(
                "polynomial max must be greater than zero".into(),
            ));
        }
        if base > max {
            return Err(PatienceError::Configuration(
                "polynomial base must not exceed max".into(),
            ));
        }
        Ok(Self {
            base,
            exponent,
            max,
        })
    }
}

impl Strategy for Polynomial {
    fn delay(&self, attempt: Attempt) -> Duration {
        if attempt <= 0 {
            return self.base;
        }
        let raw_secs = self.base.as_secs_f64() * (attempt as f64).powf(self.exponent);
        let capped_secs = raw_secs.min(self.max.as_secs_f64());
        duration_from_secs_f64_saturating(capped_secs)
    }

    fn name(&self) -> &'static str {
        "polynomial"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grows_by_exponent() {
        let s = Polynomial::new(Duration::from_millis(100), 2.0, Duration::from_secs(100)).unwrap();
        assert_eq!(s.delay(1), Duration::from_millis(100));
        assert_eq!(s.delay(2), Duration::from_millis(400));
        assert_eq!(s.delay(3), Duration::from_millis(900));
    }

    #[test]
    fn zero_or_negative_attempt_returns_base() {
        let s = Polynomial::new(Duration::from_millis(50), 2.0, Duration::from_secs(10)).unwrap();
        assert_eq!(s.delay(0), Duration::from_millis(50));
        assert_eq!(s.delay(-1), Duration::from_millis(50));
    }

    #[test]
    fn exponent_zero_is_constant_like_fixed() {
        let s = Polynomial::new(Duration::from_millis(100), 0.0, Duration::from_secs(10)).unwrap();
        for n in 1..=20 {
            assert_eq!(s.delay(n), Duration::from_millis(100));
        }
    }

    #[test]
    fn exponent_one_matches_linear_with_same_base() {
        let s = Polynomial::new(Duration::from_millis(100), 1.0, Duration::from_secs(100)).unwrap();
        assert_eq!(s.delay(1), Duration::from_millis(100));
        assert_eq!(s.delay(2), Duration::from_millis(200));
        assert_eq!(s.delay(5), Duration::from_millis(500));
    }

    #[test]
    fn caps_at_max() {
        let s = Polynomial::new(Duration::from_secs(1), 3.0, Duration::from_secs(20)).unwrap();
        assert_eq!(s.delay(100), Duration::from_secs(20));
    }

    #[test]
    fn rejects_zero_base() {
        assert!(Polynomial::new(Duration::ZERO, 2.0, Duration::from_secs(10)).is_err());
    }

    #[test]
    fn rejects_negative_exponent() {
        assert!(Polynomial::new(Duration::from_secs(1), -1.0, Duration::from_secs(10)).is_err());
    }

    #[test]
    fn rejects_zero_max() {
        assert!(Polynomial::new(Duration::from_secs(1), 2.0, Duration::ZERO).is_err());
    }

    #[test]
    fn rejects_base_greater_than_max() {
        assert!(Polynomial::new(Duration::from_secs(10), 2.0, Duration::from_secs(1)).is_err());
    }
}
