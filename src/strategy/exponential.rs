//! The `Exponential` strategy: delay doubles (or multiplies by any base)
//! each attempt.

use std::time::Duration;

use crate::duration_math::duration_from_secs_f64_saturating;
use crate::error::{PatienceError, Result};

use super::{Attempt, Strategy};

/// `delay(n) = min(base * multiplier^(n-1), max)` for `n >= 1`;
/// `delay(n <= 0) = base`. `max == Duration::ZERO` means unbounded.
///
/// The multiply-then-cap order matters: computing in floating point and
/// applying the cap *before* converting back to a `Duration` means an
/// uncapped term that would overflow (`multiplier^(n-1)` grows to
/// infinity in `f64`) never gets a chance to wrap into something
/// negative — it saturates at `max`, or at `Duration::MAX` if there is no
/// cap.
#[derive(Debug, Clone, Copy)]
pub struct Exponential {
    base: Duration,
    multiplier: f64,
    max: Duration,
}

impl Exponential {
    /// Build an exponential-backoff strategy. `max = Duration::ZERO`
    /// disables the cap.
    pub fn new(base: Duration, multiplier: f64, max: Duration) -> Result<Self> {
        if base.is_zero() {
            return Err(PatienceError::Configuration(
                "exponential base must be greater than zero".into(),
            ));
        }
        if !multiplier.is_finite() || multiplier <= 0.0 {
            return Err(PatienceError::Configuration(
                "exponential multiplier must be a positive finite number".into(),
            ));
        }
        Ok(Self {
            base,
            multiplier,
            max,
        })
    }
}

impl Strategy for Exponential {
    fn delay(&self, attempt: Attempt) -> Duration {
        if attempt <= 0 {
            return self.base;
        }
        // `delay(1)` must equal `base` for any multiplier, which this
        // formula already guarantees since `multiplier^0 == 1.0`.
        let exponent = (attempt - 1) as i32;
        let raw_secs = self.base.as_secs_f64() * self.multiplier.powi(exponent);
        let capped_secs = if self.max.is_zero() {
            raw_secs
        } else {
            raw_secs.min(self.max.as_secs_f64())
        };
        duration_from_secs_f64_saturating(capped_secs)
    }

    fn name(&self) -> &'static str {
        "exponential"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doubles_each_attempt() {
        let s = Exponential::new(Duration::from_millis(100), 2.0, Duration::ZERO).unwrap();
        assert_eq!(s.delay(1), Duration::from_millis(100));
        assert_eq!(s.delay(2), Duration::from_millis(200));
        assert_eq!(s.delay(3), Duration::from_millis(400));
    }

    #[test]
    fn zero_or_negative_attempt_returns_base() {
        let s = Exponential::new(Duration::from_millis(100), 2.0, Duration::ZERO).unwrap();
        assert_eq!(s.delay(0), Duration::from_millis(100));
        assert_eq!(s.delay(-5), Duration::from_millis(100));
    }

    #[test]
    fn delay_one_is_base_regardless_of_multiplier() {
        for m in [0.1, 1.0, 1.5, 10.0] {
            let s = Exponential::new(Duration::from_millis(250), m, Duration::ZERO).unwrap();
            assert_eq!(s.delay(1), Duration::from_millis(250));
        }
    }

    #[test]
    fn multiplier_one_is_constant() {
        let s = Exponential::new(Duration::from_millis(100), 1.0, Duration::ZERO).unwrap();
        for n in 1..=10 {
            assert_eq!(s.delay(n), Duration::from_millis(100));
        }
    }

    #[test]
    fn caps_at_max() {
        let s = Exponential::new(Duration::from_secs(1), 2.0, Duration::from_secs(10)).unwrap();
        assert_eq!(s.delay(10), Duration::from_secs(10));
    }

    #[test]
    fn never_negative_even_for_huge_exponents() {
        let s = Exponential::new(Duration::from_secs(1), 2.0, Duration::ZERO).unwrap();
        let d = s.delay(2000);
        assert!(d >= Duration::ZERO);
        assert_eq!(d, Duration::MAX);
    }

    #[test]
    fn rejects_zero_base() {
        assert!(Exponential::new(Duration::ZERO, 2.0, Duration::ZERO).is_err());
    }

    #[test]
    fn rejects_non_positive_multiplier() {
        assert!(Exponential::new(Duration::from_secs(1), 0.0, Duration::ZERO).is_err());
        assert!(Exponential::new(Duration::from_secs(1), -1.0, Duration::ZERO).is_err());
    }
}
