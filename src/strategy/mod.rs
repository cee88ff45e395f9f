//! Backoff strategies: the delay-scheduling core.
//!
//! [`Strategy`] is the one operation every backoff strategy implements:
//! attempt index in, delay out. Two optional capabilities — [`Observing`]
//! and [`Learning`] — are exposed through `as_observing`/`as_learning`
//! rather than by matching on a concrete type. The source this crate
//! replaces used `instanceof`-style checks ("if strategy is HTTPAware,
//! call observe") scattered through the runner; a capability query collapses
//! that into one place per strategy and keeps the runner generic over `dyn
//! Strategy`.

pub mod adaptive;
pub mod diophantine;
pub mod exponential;
pub mod fibonacci;
pub mod fixed;
pub mod http_aware;
pub mod jitter;
pub mod linear;
pub mod polynomial;

pub use adaptive::AdaptiveLearner;
pub use diophantine::{Diophantine, RateLimitDescriptor};
pub use exponential::Exponential;
pub use fibonacci::Fibonacci;
pub use fixed::Fixed;
pub use http_aware::HttpAware;
pub use jitter::{DecorrelatedJitter, FullJitter};
pub use linear::Linear;
pub use polynomial::Polynomial;

use std::time::Duration;

/// An attempt index is 1-based. `0` or negative means "no prior history".
pub type Attempt = i64;

/// Maps an attempt index to a delay. Every strategy implements this and
/// nothing else is required of it.
///
/// # Contract
///
/// - Must return a non-negative duration.
/// - Must return a value `<= max_delay` if the strategy has a configured
///   cap.
/// - For `attempt <= 0`, returns the strategy's base unit.
/// - Must be pure with respect to the strategy's own mutable state —
///   callers may invoke `delay` repeatedly without side effects changing
///   the answer (randomised strategies aside, whose *source* of
///   randomness is the only thing that varies the answer).
pub trait Strategy: Send + Sync {
    /// Compute the delay to wait before the given attempt.
    fn delay(&self, attempt: Attempt) -> Duration;

    /// A short, stable name used for effectiveness bookkeeping and CLI
    /// diagnostics.
    fn name(&self) -> &'static str;

    /// Capability query: does this strategy want to see the previous
    /// attempt's captured output before its next `delay` call?
    ///
    /// Default: no. [`HttpAware`] overrides this.
    fn as_observing(&self) -> Option<&dyn Observing> {
        None
    }

    /// Capability query: does this strategy want outcome history recorded?
    ///
    /// Default: no. [`AdaptiveLearner`] overrides this.
    fn as_learning(&self) -> Option<&dyn Learning> {
        None
    }

    /// Capability query: does this strategy gate scheduling a new
    /// request on a rate-limit feasibility check before the runner
    /// sleeps?
    ///
    /// Default: no. [`Diophantine`] overrides this.
    fn as_scheduling(&self) -> Option<&dyn Scheduling> {
        None
    }
}

/// Optional capability: strategies that want to inspect an attempt's
/// captured output before being asked for the next delay implement this.
///
/// The runner calls `observe` immediately after capturing an attempt's
/// output and before computing that attempt's verdict (see the
/// orchestration contract) — `observe(i)` always precedes `delay(i)`.
pub trait Observing: Send + Sync {
    /// Inspect the most recent attempt's output. Implementations must make
    /// the effect of this call visible to the *next* `delay` call.
    fn observe(&self, stdout: &str, stderr: &str, exit_code: i32);
}

/// Optional capability: strategies that adapt their delay based on
/// observed success/failure history implement this.
pub trait Learning: Send + Sync {
    /// Record the outcome of an attempt that used `delay_chosen`.
    fn record_outcome(&self, delay_chosen: Duration, success: bool, latency: Duration);
}

/// Optional capability: strategies that proactively gate scheduling a
/// new request on a declared rate limit implement this.
pub trait Scheduling: Send + Sync {
    /// `true` iff scheduling a new request at `t` (given the session's
    /// prior request times) keeps every sliding window within the
    /// declared rate limit.
    fn can_schedule(&self, existing_times: &[std::time::SystemTime], t: std::time::SystemTime) -> bool;
}
