//! The `Fixed` strategy: the same delay on every attempt.

use std::time::Duration;

use super::{Attempt, Strategy};

/// Always waits the same amount of time between attempts.
#[derive(Debug, Clone, Copy)]
pub struct Fixed {
    delay: Duration,
}

impl Fixed {
    /// Build a fixed-delay strategy.
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Strategy for Fixed {
    fn delay(&self, _attempt: Attempt) -> Duration {
        self.delay
    }

    fn name(&self) -> &'static str {
        "fixed"
    }
}
