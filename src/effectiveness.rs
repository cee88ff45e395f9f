//! Per-strategy success-rate bookkeeping, independent of any one
//! strategy instance.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use crate::clock::SharedClock;

/// A snapshot of one strategy's recorded history.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectivenessEntry {
    pub total_attempts: u64,
    pub successful_retries: u64,
    pub average_delay: Duration,
    pub success_rate: f64,
    pub last_updated: std::time::SystemTime,
}

impl EffectivenessEntry {
    fn new(now: std::time::SystemTime) -> Self {
        Self {
            total_attempts: 0,
            successful_retries: 0,
            average_delay: Duration::ZERO,
            success_rate: 0.0,
            last_updated: now,
        }
    }
}

/// A keyed map of strategy name to [`EffectivenessEntry`]. All
/// mutation is serialised behind a single writer lock; reads take a
/// read lock and return a copy, never a reference into the map.
pub struct EffectivenessTracker {
    clock: SharedClock,
    entries: RwLock<HashMap<String, EffectivenessEntry>>,
}

impl EffectivenessTracker {
    pub fn new(clock: SharedClock) -> Self {
        Self {
            clock,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Record one attempt's outcome for `strategy`. `average_delay` is
    /// recomputed as the exact running mean, not an approximation.
    pub fn record(&self, strategy: &str, success: bool, delay: Duration) {
        let now = self.clock.now();
        let mut entries = self.entries.write().expect("effectiveness lock poisoned");
        let entry = entries
            .entry(strategy.to_string())
            .or_insert_with(|| EffectivenessEntry::new(now));

        let n = entry.total_attempts + 1;
        let avg_secs =
            (entry.average_delay.as_secs_f64() * (n - 1) as f64 + delay.as_secs_f64()) / n as f64;
        entry.average_delay = Duration::from_secs_f64(avg_secs.max(0.0));
        entry.total_attempts = n;
        if success {
            entry.successful_retries += 1;
        }
        entry.success_rate = entry.successful_retries as f64 / entry.total_attempts as f64;
        entry.last_updated = now;
    }

    /// A snapshot copy of `strategy`'s entry, if it has recorded
    /// anything yet.
    pub fn metrics(&self, strategy: &str) -> Option<EffectivenessEntry> {
        let entries = self.entries.read().expect("effectiveness lock poisoned");
        entries.get(strategy).copied()
    }

    /// The strategy with the highest `success_rate` among those with at
    /// least 3 recorded attempts. Ties broken by higher
    /// `total_attempts`, then by earliest `last_updated`.
    pub fn best_strategy(&self) -> Option<(String, EffectivenessEntry)> {
        let entries = self.entries.read().expect("effectiveness lock poisoned");
        entries
            .iter()
            .filter(|(_, e)| e.total_attempts >= 3)
            .max_by(|(_, a), (_, b)| {
                a.success_rate
                    .partial_cmp(&b.success_rate)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(a.total_attempts.cmp(&b.total_attempts))
                    .then(b.last_updated.cmp(&a.last_updated))
            })
            .map(|(name, entry)| (name.clone(), *entry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use std::sync::Arc;
    use std::time::SystemTime;

    fn tracker() -> EffectivenessTracker {
        EffectivenessTracker::new(Arc::new(FixedClock(SystemTime::UNIX_EPOCH)))
    }

    #[test]
    fn success_rate_is_exact() {
        let t = tracker();
        t.record("fixed", true, Duration::from_secs(1));
        t.record("fixed", true, Duration::from_secs(1));
        t.record("fixed", false, Duration::from_secs(1));
        let m = t.metrics("fixed").unwrap();
        assert_eq!(m.total_attempts, 3);
        assert_eq!(m.successful_retries, 2);
        assert!((m.success_rate - 2.0 / 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn average_delay_is_exact_running_mean() {
        let t = tracker();
        t.record("fixed", true, Duration::from_secs(1));
        t.record("fixed", true, Duration::from_secs(3));
        let m = t.metrics("fixed").unwrap();
        assert_eq!(m.average_delay, Duration::from_secs(2));
    }

    #[test]
    fn metrics_for_unknown_strategy_is_none() {
        let t = tracker();
        assert!(t.metrics("nonexistent").is_none());
    }

    #[test]
    fn best_strategy_requires_at_least_three_attempts() {
        let t = tracker();
        t.record("a", true, Duration::from_secs(1));
        t.record("a", true, Duration::from_secs(1));
        assert!(t.best_strategy().is_none());
        t.record("a", true, Duration::from_secs(1));
        assert_eq!(t.best_strategy().unwrap().0, "a");
    }

    #[test]
    fn best_strategy_picks_highest_success_rate() {
        let t = tracker();
        for _ in 0..3 {
            t.record("low", false, Duration::from_secs(1));
        }
        for _ in 0..3 {
            t.record("high", true, Duration::from_secs(1));
        }
        assert_eq!(t.best_strategy().unwrap().0, "high");
    }
}
