//! Saturating duration arithmetic shared by the deterministic strategies.
//!
//! `std::time::Duration` is already non-negative, which satisfies half of
//! the data model's "non-negative span" requirement for free. The other
//! half — "arithmetic saturates at the strategy's configured maximum;
//! overflow must never produce a negative or wrapped value" — needs a
//! little care because `Duration::saturating_mul` only accepts a `u32`
//! multiplier, and the Fibonacci strategy's multiplier can exceed that.

use std::time::Duration;

/// Multiply a duration by an integer factor, saturating at `Duration::MAX`
/// instead of panicking or wrapping.
pub fn saturating_scale(base: Duration, factor: u64) -> Duration {
    let nanos = base.as_nanos().saturating_mul(factor as u128);
    let capped = nanos.min(Duration::MAX.as_nanos());
    nanos_to_duration(capped)
}

/// Convert an `f64` count of seconds to a `Duration`, clamping negative or
/// non-finite inputs to zero and saturating at `Duration::MAX`.
pub fn duration_from_secs_f64_saturating(secs: f64) -> Duration {
    if !secs.is_finite() || secs <= 0.0 {
        return Duration::ZERO;
    }
    if secs >= Duration::MAX.as_secs_f64() {
        return Duration::MAX;
    }
    Duration::from_secs_f64(secs)
}

/// `0` means "unbounded" for the strategies that allow it (Linear,
/// Exponential, Fibonacci, Polynomial all share this convention in this
/// implementation — see DESIGN.md).
pub fn apply_optional_cap(value: Duration, max: Duration) -> Duration {
    if max.is_zero() {
        value
    } else {
        value.min(max)
    }
}

fn nanos_to_duration(nanos: u128) -> Duration {
    let secs = (nanos / 1_000_000_000) as u64;
    let sub_nanos = (nanos % 1_000_000_000) as u32;
    Duration::new(secs, sub_nanos)
}
