//! Wraps a fallback strategy and honours server-specified retry timing
//! extracted from the child's captured output.

use std::sync::Mutex;
use std::time::Duration;

use crate::clock::SharedClock;
use crate::http_parser::parse_retry_hint;

use super::{Attempt, Observing, Strategy};

/// Holds `last_retry_after` (reset to zero at the start of every
/// `observe` call) and a configured `max_retry_after` cap.
///
/// `observe` is mandatory before each `delay` call: a hint applies only
/// to the *next* scheduling decision, so a later attempt with no hint
/// must fall back rather than reuse a stale value. That is exactly why
/// `last_retry_after` is cleared unconditionally at the top of
/// `observe`, before C4 even runs.
pub struct HttpAware {
    fallback: Box<dyn Strategy>,
    max_retry_after: Duration,
    clock: SharedClock,
    last_retry_after: Mutex<Duration>,
}

impl HttpAware {
    /// `max_retry_after = Duration::ZERO` disables the cap.
    pub fn new(fallback: Box<dyn Strategy>, max_retry_after: Duration, clock: SharedClock) -> Self {
        Self {
            fallback,
            max_retry_after,
            clock,
            last_retry_after: Mutex::new(Duration::ZERO),
        }
    }
}

impl Strategy for HttpAware {
    fn delay(&self, attempt: Attempt) -> Duration {
        let last = *self.last_retry_after.lock().expect("http-aware mutex poisoned");
        if last > Duration::ZERO {
            last
        } else {
            self.fallback.delay(attempt)
        }
    }

    fn name(&self) -> &'static str {
        "http-aware"
    }

    fn as_observing(&self) -> Option<&dyn Observing> {
        Some(self)
    }
}

impl Observing for HttpAware {
    fn observe(&self, stdout: &str, stderr: &str, _exit_code: i32) {
        let mut last = self.last_retry_after.lock().expect("http-aware mutex poisoned");
        *last = Duration::ZERO;
        let hint = parse_retry_hint(stdout, stderr, self.clock.as_ref());
        if let Some(found) = hint.retry_after {
            *last = if self.max_retry_after.is_zero() {
                found
            } else {
                found.min(self.max_retry_after)
            };
        }
    }
}
