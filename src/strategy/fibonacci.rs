//! The `Fibonacci` strategy: delay follows the Fibonacci sequence scaled
//! by a unit duration.

use std::time::Duration;

use crate::duration_math::apply_optional_cap;
use crate::error::{PatienceError, Result};

use super::{Attempt, Strategy};

/// `delay(n) = min(unit * fib(n), max)` for `n >= 1`, where `fib(1) =
/// fib(2) = 1`; `delay(n <= 0) = unit`. `max == Duration::ZERO` means
/// unbounded.
///
/// The sequence is generated iteratively in constant space — no
/// recursion, no memoised table — since `n` is an unbounded attempt
/// counter, not a small fixed index.
#[derive(Debug, Clone, Copy)]
pub struct Fibonacci {
    unit: Duration,
    max: Duration,
}

impl Fibonacci {
    /// Build a Fibonacci-backoff strategy. `max = Duration::ZERO` disables
    /// the cap.
    pub fn new(unit: Duration, max: Duration) -> Result<Self> {
        if unit.is_zero() {
            return Err(PatienceError::Configuration(
                "fibonacci unit must be greater than zero".into(),
            ));
        }
        Ok(Self { unit, max })
    }

    fn fib(n: u64) -> u64 {
        let (mut a, mut b) = (0u64, 1u64);
        for _ in 0..n {
            let next = a.saturating_add(b);
            a = b;
            b = next;
        }
        a
    }
}

impl Strategy for Fibonacci {
    fn delay(&self, attempt: Attempt) -> Duration {
        if attempt <= 0 {
            return self.unit;
        }
        let n = attempt.min(i64::from(u32::MAX)) as u64;
        let factor = Self::fib(n);
        let raw = self.unit.saturating_mul(factor.min(u64::from(u32::MAX)) as u32);
        apply_optional_cap(raw, self.max)
    }

    fn name(&self) -> &'static str {
        "fibonacci"
    }
}
