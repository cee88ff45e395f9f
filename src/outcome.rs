//! The outcome record shared by the adaptive learner and the effectiveness
//! tracker.

use std::time::Duration;

/// One completed attempt, as reported back into the learning components.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    /// The delay the strategy produced for the attempt that yielded this
    /// outcome.
    pub delay_chosen: Duration,
    /// Whether the attempt succeeded.
    pub success: bool,
    /// How long the child took before completing or being killed. May be
    /// zero.
    pub latency: Duration,
}

impl Outcome {
    /// Build an outcome record.
    pub fn new(delay_chosen: Duration, success: bool, latency: Duration) -> Self {
        Self {
            delay_chosen,
            success,
            latency,
        }
    }
}
