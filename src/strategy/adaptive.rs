//! The adaptive learner: a bucketed exponential moving average over
//! recent outcome history, blended with a fallback strategy.

use std::collections::VecDeque;
use std::sync::RwLock;
use std::time::Duration;

use crate::duration_math::duration_from_secs_f64_saturating;
use crate::error::{PatienceError, Result};
use crate::outcome::Outcome;

use super::{Attempt, Learning, Strategy};

const BUCKET_COUNT: usize = 7;

/// Lower bound, in milliseconds, of each of the seven fixed buckets.
/// Delays at or above the last bound (60 s) — including delays at or
/// above 300 s — all land in the final bucket; there is no eighth
/// bound to check against.
const BUCKET_LOWER_BOUNDS_MS: [i64; BUCKET_COUNT] = [0, 1_000, 2_000, 5_000, 10_000, 30_000, 60_000];

const BUCKET_RANGES: [(u64, u64); BUCKET_COUNT] = [
    (0, 1),
    (1, 2),
    (2, 5),
    (5, 10),
    (10, 30),
    (30, 60),
    (60, 300),
];

/// Maps a delay, in milliseconds, to its bucket. Negative delays have
/// no bucket.
///
/// Kept as a free function over a raw millisecond count (rather than a
/// method over `Duration`) because the boundary behaviour this
/// implements is specified in those terms, including a case — a
/// negative delay — that `Duration` itself cannot represent.
pub fn bucket_index(delay_ms: i64) -> Option<usize> {
    if delay_ms < 0 {
        return None;
    }
    for i in (0..BUCKET_COUNT).rev() {
        if delay_ms >= BUCKET_LOWER_BOUNDS_MS[i] {
            return Some(i);
        }
    }
    Some(0)
}

#[derive(Debug, Clone, Copy)]
struct Bucket {
    min_delay: Duration,
    max_delay: Duration,
    success_rate: f64,
    sample_count: usize,
    total_latency: Duration,
}

impl Bucket {
    fn new(min_secs: u64, max_secs: u64) -> Self {
        Self {
            min_delay: Duration::from_secs(min_secs),
            max_delay: Duration::from_secs(max_secs),
            success_rate: 0.0,
            sample_count: 0,
            total_latency: Duration::ZERO,
        }
    }

    fn reset(&mut self) {
        self.success_rate = 0.0;
        self.sample_count = 0;
        self.total_latency = Duration::ZERO;
    }
}

fn new_buckets() -> [Bucket; BUCKET_COUNT] {
    let mut buckets = [Bucket::new(0, 0); BUCKET_COUNT];
    for (i, (min_secs, max_secs)) in BUCKET_RANGES.into_iter().enumerate() {
        buckets[i] = Bucket::new(min_secs, max_secs);
    }
    buckets
}

struct State {
    buckets: [Bucket; BUCKET_COUNT],
    fifo: VecDeque<Outcome>,
    total: u64,
}

/// Holds a fallback strategy, a learning rate, a bounded FIFO of recent
/// outcomes, and a fixed bucket array recomputed on every
/// `record_outcome`.
///
/// The bucket array is allocated eagerly at construction (all seven
/// buckets always exist), which sidesteps the lock-upgrade hazard a
/// lazily-initialised bucket array would otherwise need
/// double-checked locking to avoid: there is no "first write wins"
/// race to guard against because there is no first write. `delay` and
/// `record_outcome` both take the single `RwLock` for exactly as long
/// as their read or write needs, and neither calls a helper that
/// re-enters it.
pub struct AdaptiveLearner {
    fallback: Box<dyn Strategy>,
    learning_rate: f64,
    memory_window: usize,
    state: RwLock<State>,
}

impl AdaptiveLearner {
    pub fn new(fallback: Box<dyn Strategy>, learning_rate: f64, memory_window: usize) -> Result<Self> {
        if !(0.0..=1.0).contains(&learning_rate) || learning_rate == 0.0 {
            return Err(PatienceError::Configuration(
                "adaptive learning rate must be in (0, 1]".into(),
            ));
        }
        if memory_window == 0 || memory_window > 10_000 {
            return Err(PatienceError::Configuration(
                "adaptive memory window must be in [1, 10000]".into(),
            ));
        }
        Ok(Self {
            fallback,
            learning_rate,
            memory_window,
            state: RwLock::new(State {
                buckets: new_buckets(),
                fifo: VecDeque::with_capacity(memory_window),
                total: 0,
            }),
        })
    }

    pub fn record_outcome(&self, delay_chosen: Duration, success: bool, latency: Duration) {
        let mut state = self.state.write().expect("adaptive lock poisoned");
        if state.fifo.len() >= self.memory_window {
            state.fifo.pop_front();
        }
        state.fifo.push_back(Outcome::new(delay_chosen, success, latency));
        state.total += 1;
        self.recompute_locked(&mut state);
    }

    /// Recompute every bucket from the current FIFO, oldest outcome
    /// first, so the EMA decays naturally as outcomes age out of the
    /// window. Takes `&mut State` directly rather than re-locking —
    /// the caller already holds the write lock.
    fn recompute_locked(&self, state: &mut State) {
        for bucket in &mut state.buckets {
            bucket.reset();
        }
        for outcome in &state.fifo {
            let delay_ms = outcome.delay_chosen.as_millis().min(i64::MAX as u128) as i64;
            let Some(idx) = bucket_index(delay_ms) else {
                continue;
            };
            let bucket = &mut state.buckets[idx];
            let y = if outcome.success { 1.0 } else { 0.0 };
            bucket.success_rate = (1.0 - self.learning_rate) * bucket.success_rate + self.learning_rate * y;
            bucket.sample_count += 1;
            bucket.total_latency += outcome.latency;
        }
    }

    /// Diagnostic helper for tests: the current success rate recorded
    /// for whatever bucket a given delay falls into. Takes its own read
    /// lock; must never be called from a context already holding one.
    pub fn success_rate_for_delay(&self, delay: Duration) -> Option<f64> {
        let idx = bucket_index(delay.as_millis().min(i64::MAX as u128) as i64)?;
        let state = self.state.read().expect("adaptive lock poisoned");
        Some(state.buckets[idx].success_rate)
    }

    fn best_bucket(state: &State) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (i, bucket) in state.buckets.iter().enumerate() {
            if bucket.sample_count < 2 {
                continue;
            }
            match best {
                Some((_, rate)) if rate >= bucket.success_rate => {}
                _ => best = Some((i, bucket.success_rate)),
            }
        }
        best.map(|(i, _)| i)
    }
}

impl Strategy for AdaptiveLearner {
    fn delay(&self, attempt: Attempt) -> Duration {
        if attempt <= 0 {
            return self.fallback.delay(attempt);
        }
        let use_bucket = {
            let state = self.state.read().expect("adaptive lock poisoned");
            if state.total < 3 {
                None
            } else {
                Self::best_bucket(&state).map(|idx| state.buckets[idx])
            }
        };
        let Some(bucket) = use_bucket else {
            return self.fallback.delay(attempt);
        };
        let optimal = bucket.min_delay + (bucket.max_delay.saturating_sub(bucket.min_delay)) / 2;
        let fallback = self.fallback.delay(attempt);
        let blended_secs =
            self.learning_rate * optimal.as_secs_f64() + (1.0 - self.learning_rate) * fallback.as_secs_f64();
        duration_from_secs_f64_saturating(blended_secs)
    }

    fn name(&self) -> &'static str {
        "adaptive"
    }

    fn as_learning(&self) -> Option<&dyn Learning> {
        Some(self)
    }
}

impl Learning for AdaptiveLearner {
    fn record_outcome(&self, delay_chosen: Duration, success: bool, latency: Duration) {
        AdaptiveLearner::record_outcome(self, delay_chosen, success, latency);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::fixed::Fixed;

    fn learner(rate: f64, window: usize) -> AdaptiveLearner {
        AdaptiveLearner::new(Box::new(Fixed::new(Duration::from_secs(5))), rate, window).unwrap()
    }

    #[test]
    fn bucket_boundaries_match_spec() {
        assert_eq!(bucket_index(999), Some(0));
        assert_eq!(bucket_index(1000), Some(1));
        assert_eq!(bucket_index(300_000), Some(6));
        assert_eq!(bucket_index(3_600_000), Some(6));
        assert_eq!(bucket_index(-1), None);
    }

    #[test]
    fn defers_to_fallback_below_three_outcomes() {
        let l = learner(0.5, 10);
        l.record_outcome(Duration::from_millis(800), true, Duration::from_millis(1));
        l.record_outcome(Duration::from_millis(800), true, Duration::from_millis(1));
        assert_eq!(l.delay(1), Duration::from_secs(5));
    }

    #[test]
    fn defers_to_fallback_for_nonpositive_attempt() {
        let l = learner(0.5, 10);
        for _ in 0..5 {
            l.record_outcome(Duration::from_millis(800), true, Duration::from_millis(1));
        }
        assert_eq!(l.delay(0), Duration::from_secs(5));
        assert_eq!(l.delay(-1), Duration::from_secs(5));
    }

    #[test]
    fn blends_toward_bucket_midpoint_once_learning() {
        let l = AdaptiveLearner::new(Box::new(Fixed::new(Duration::from_secs(5))), 0.5, 10).unwrap();
        for _ in 0..5 {
            l.record_outcome(Duration::from_millis(800), true, Duration::from_millis(1));
        }
        let d = l.delay(1);
        assert!(d < Duration::from_secs(5));
        assert!(d > Duration::ZERO);
    }

    #[test]
    fn ema_sequence_matches_expected_value() {
        // [T, F, T] with λ = 0.3 in a single bucket: rate = 0.447 ± 0.01.
        let l = AdaptiveLearner::new(Box::new(Fixed::new(Duration::from_secs(5))), 0.3, 10).unwrap();
        l.record_outcome(Duration::from_millis(500), true, Duration::ZERO);
        l.record_outcome(Duration::from_millis(500), false, Duration::ZERO);
        l.record_outcome(Duration::from_millis(500), true, Duration::ZERO);
        let rate = l.success_rate_for_delay(Duration::from_millis(500)).unwrap();
        assert!((rate - 0.447).abs() < 0.01, "rate was {rate}");
    }

    #[test]
    fn alternating_pattern_converges_near_half() {
        let l = AdaptiveLearner::new(Box::new(Fixed::new(Duration::from_secs(5))), 0.2, 200).unwrap();
        for i in 0..40 {
            l.record_outcome(Duration::from_millis(500), i % 2 == 0, Duration::ZERO);
        }
        let rate = l.success_rate_for_delay(Duration::from_millis(500)).unwrap();
        assert!((rate - 0.5).abs() < 0.15, "rate was {rate}");
    }

    #[test]
    fn fifo_drops_oldest_outcome_past_memory_window() {
        let l = AdaptiveLearner::new(Box::new(Fixed::new(Duration::from_secs(5))), 0.5, 2).unwrap();
        l.record_outcome(Duration::from_millis(500), false, Duration::ZERO);
        l.record_outcome(Duration::from_millis(500), false, Duration::ZERO);
        l.record_outcome(Duration::from_millis(500), true, Duration::ZERO);
        // only the last two outcomes (false, true) survive.
        let rate = l.success_rate_for_delay(Duration::from_millis(500)).unwrap();
        assert!(rate > 0.0);
    }

    #[test]
    fn rejects_out_of_range_learning_rate() {
        assert!(AdaptiveLearner::new(Box::new(Fixed::new(Duration::from_secs(1))), 0.0, 10).is_err());
        assert!(AdaptiveLearner::new(Box::new(Fixed::new(Duration::from_secs(1))), 1.5, 10).is_err());
    }

    #[test]
    fn rejects_out_of_range_memory_window() {
        assert!(AdaptiveLearner::new(Box::new(Fixed::new(Duration::from_secs(1))), 0.5, 0).is_err());
        assert!(AdaptiveLearner::new(Box::new(Fixed::new(Duration::from_secs(1))), 0.5, 10_001).is_err());
    }

    #[test]
    fn exposes_learning_capability() {
        let l = learner(0.5, 10);
        assert!(l.as_learning().is_some());
        assert!(l.as_observing().is_none());
    }

    #[test]
    fn concurrent_record_and_delay_do_not_deadlock() {
        use std::sync::Arc;
        use std::thread;

        let l = Arc::new(AdaptiveLearner::new(Box::new(Fixed::new(Duration::from_secs(1))), 0.3, 50).unwrap());
        let mut handles = Vec::new();
        for t in 0..8 {
            let l = Arc::clone(&l);
            handles.push(thread::spawn(move || {
                for i in 0..50 {
                    if (t + i) % 2 == 0 {
                        l.record_outcome(Duration::from_millis(500), i % 2 == 0, Duration::ZERO);
                    } else {
                        let _ = l.delay(5);
                    }
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        let state = l.state.read().unwrap();
        for bucket in &state.buckets {
            assert!(bucket.sample_count <= 50);
        }
    }
}
