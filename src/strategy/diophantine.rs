//! Proactive rate-limit scheduling: is there room in the window for one
//! more request?

use std::time::{Duration, SystemTime};

use crate::duration_math::apply_optional_cap;

use super::{Attempt, Scheduling, Strategy};

/// A declared rate limit: at most `limit` requests in any sliding
/// window of length `window`. `retry_offsets[0]` is always zero,
/// denoting the initial request; the rest are offsets from a
/// hypothetical new request time at which retries would land.
#[derive(Debug, Clone)]
pub struct RateLimitDescriptor {
    pub limit: u32,
    pub window: Duration,
    pub retry_offsets: Vec<Duration>,
}

/// Wraps a [`RateLimitDescriptor`] and exposes the scheduling predicate
/// plus an exponential fallback delay for when the scheduler isn't (yet)
/// the thing deciding whether to proceed.
pub struct Diophantine {
    descriptor: RateLimitDescriptor,
}

impl Diophantine {
    pub fn new(descriptor: RateLimitDescriptor) -> Self {
        Self { descriptor }
    }

    /// `true` iff scheduling a new request at `t` — together with
    /// every retry it may generate at `t + retry_offsets[i]` — keeps
    /// every sliding window of length `window` at or under `limit`
    /// requests, counting `existing_times` too.
    ///
    /// Exact, not approximate: sorts the combined multiset once
    /// (`O(n log n)`) then walks a two-pointer sliding window over it
    /// (`O(n)` amortised) rather than re-scanning per element.
    pub fn can_schedule(&self, existing_times: &[SystemTime], t: SystemTime) -> bool {
        let mut times: Vec<SystemTime> = Vec::with_capacity(
            existing_times.len() + self.descriptor.retry_offsets.len(),
        );
        times.extend_from_slice(existing_times);
        for offset in &self.descriptor.retry_offsets {
            times.push(t + *offset);
        }
        times.sort();

        let n = times.len();
        let window = self.descriptor.window;
        let mut right = 0usize;
        for left in 0..n {
            if right < left {
                right = left;
            }
            while right < n {
                match times[right].duration_since(times[left]) {
                    Ok(elapsed) if elapsed < window => right += 1,
                    _ => break,
                }
            }
            let count = right - left;
            if count as u64 > u64::from(self.descriptor.limit) {
                return false;
            }
        }
        true
    }
}

impl Strategy for Diophantine {
    /// Exponential growth from the second retry offset (or 1 s if
    /// absent), doubling each attempt, capped at one hour. This is a
    /// fallback for use while the scheduler's feasibility check is not
    /// the thing gating the next attempt.
    fn delay(&self, attempt: Attempt) -> Duration {
        let base = self
            .descriptor
            .retry_offsets
            .get(1)
            .copied()
            .filter(|d| !d.is_zero())
            .unwrap_or(Duration::from_secs(1));
        let max = Duration::from_secs(3600);
        if attempt <= 0 {
            return base;
        }
        let exponent = attempt.min(i64::from(u32::MAX)).saturating_sub(1);
        let factor = 1u32.checked_shl(exponent.min(31) as u32).unwrap_or(u32::MAX);
        let raw = base.saturating_mul(factor);
        apply_optional_cap(raw, max)
    }

    fn name(&self) -> &'static str {
        "diophantine"
    }

    fn as_scheduling(&self) -> Option<&dyn Scheduling> {
        Some(self)
    }
}

impl Scheduling for Diophantine {
    fn can_schedule(&self, existing_times: &[SystemTime], t: SystemTime) -> bool {
        Diophantine::can_schedule(self, existing_times, t)
    }
}
