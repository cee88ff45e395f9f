//! Jitter strategies: randomised delays that spread out retries from a
//! thundering herd of identical clients.

use std::sync::Mutex;
use std::time::Duration;

use crate::duration_math::duration_from_secs_f64_saturating;
use crate::error::{PatienceError, Result};
use crate::rng::RandomSource;

use super::{Attempt, Strategy};

/// `cap = min(base * multiplier^(n-1), max)` for `n >= 1` (`max ==
/// Duration::ZERO` disables the cap); draws `u` uniform in `[0, 1)` and
/// returns `u * cap`. For `n <= 0`, returns `u * base`.
pub struct FullJitter {
    base: Duration,
    multiplier: f64,
    max: Duration,
    random: Box<dyn RandomSource>,
}

impl FullJitter {
    pub fn new(
        base: Duration,
        multiplier: f64,
        max: Duration,
        random: Box<dyn RandomSource>,
    ) -> Result<Self> {
        if base.is_zero() {
            return Err(PatienceError::Configuration(
                "jitter base must be greater than zero".into(),
            ));
        }
        if !multiplier.is_finite() || multiplier <= 0.0 {
            return Err(PatienceError::Configuration(
                "jitter multiplier must be a positive finite number".into(),
            ));
        }
        Ok(Self {
            base,
            multiplier,
            max,
            random,
        })
    }
}

impl Strategy for FullJitter {
    fn delay(&self, attempt: Attempt) -> Duration {
        let u = self.random.uniform();
        if attempt <= 0 {
            return duration_from_secs_f64_saturating(self.base.as_secs_f64() * u);
        }
        let exponent = (attempt - 1) as i32;
        let raw_secs = self.base.as_secs_f64() * self.multiplier.powi(exponent);
        let cap_secs = if self.max.is_zero() {
            raw_secs
        } else {
            raw_secs.min(self.max.as_secs_f64())
        };
        duration_from_secs_f64_saturating(cap_secs * u)
    }

    fn name(&self) -> &'static str {
        "full-jitter"
    }
}

/// Holds a per-instance `previous_delay`, initially zero, and ignores
/// the attempt index entirely — each call grows off the *last chosen*
/// delay, not off `n`.
///
/// On each call: `upper = previous_delay * multiplier` if
/// `previous_delay > 0` else `base * multiplier`; `upper =
/// min(upper, max)` if `max > 0`; `upper = max(upper, base)`; `chosen =
/// base + u * (upper - base)`; `previous_delay` is set to `chosen`
/// before returning it.
///
/// The mutation of `previous_delay` is serialised behind a `Mutex`
/// since the strategy contract permits sharing one instance across
/// threads.
pub struct DecorrelatedJitter {
    base: Duration,
    multiplier: f64,
    max: Duration,
    random: Box<dyn RandomSource>,
    previous_delay: Mutex<Duration>,
}

impl DecorrelatedJitter {
    pub fn new(
        base: Duration,
        multiplier: f64,
        max: Duration,
        random: Box<dyn RandomSource>,
    ) -> Result<Self> {
        if base.is_zero() {
            return Err(PatienceError::Configuration(
                "jitter base must be greater than zero".into(),
            ));
        }
        if !multiplier.is_finite() || multiplier <= 0.0 {
            return Err(PatienceError::Configuration(
                "jitter multiplier must be a positive finite number".into(),
            ));
        }
        Ok(Self {
            base,
            multiplier,
            max,
            random,
            previous_delay: Mutex::new(Duration::ZERO),
        })
    }
}

impl Strategy for DecorrelatedJitter {
    fn delay(&self, _attempt: Attempt) -> Duration {
        let mut previous = self.previous_delay.lock().expect("jitter mutex poisoned");
        let base_secs = self.base.as_secs_f64();
        let prev_secs = previous.as_secs_f64();
        let mut upper_secs = if prev_secs > 0.0 {
            prev_secs * self.multiplier
        } else {
            base_secs * self.multiplier
        };
        if !self.max.is_zero() {
            upper_secs = upper_secs.min(self.max.as_secs_f64());
        }
        upper_secs = upper_secs.max(base_secs);

        let u = self.random.uniform();
        let chosen_secs = base_secs + u * (upper_secs - base_secs);
        let chosen = duration_from_secs_f64_saturating(chosen_secs);
        *previous = chosen;
        chosen
    }

    fn name(&self) -> &'static str {
        "decorrelated-jitter"
    }
}
