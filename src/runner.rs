//! The orchestration contract (C10): what gets called, in what order,
//! and how the session-wide timeout and the per-attempt child
//! invocation interact with the delay-scheduling core.
//!
//! Out of the core's stated scope — I/O, process lifetime, and wall-clock
//! enforcement all live here — but the ordering this loop follows is a
//! first-class contract: `observe(i)` must run before `delay(i)` is ever
//! queried, since the HTTP-aware strategy depends on seeing the
//! current attempt's output first.

use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

use tracing::{debug, warn};

use crate::child::ChildProcess;
use crate::clock::SharedClock;
use crate::config::SessionConfig;
use crate::effectiveness::EffectivenessTracker;
use crate::error::{PatienceError, Result};
use crate::pattern::PatternMatcher;
use crate::strategy::Strategy;

/// How the runner polls a proactive scheduler that currently denies
/// the next request.
const SCHEDULE_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// The result of a completed (not aborted) session.
#[derive(Debug, Clone, Copy)]
pub struct SessionOutcome {
    pub exit_code: i32,
    pub succeeded: bool,
    pub attempts_made: u32,
}

pub struct Runner {
    strategy: Box<dyn Strategy>,
    attempts: u32,
    attempt_timeout: Duration,
    session_timeout: Duration,
    matcher: PatternMatcher,
    program: String,
    args: Vec<String>,
    clock: SharedClock,
    effectiveness: Arc<EffectivenessTracker>,
}

impl Runner {
    pub fn new(config: SessionConfig, clock: SharedClock, effectiveness: Arc<EffectivenessTracker>) -> Self {
        Self {
            strategy: config.strategy,
            attempts: config.attempts,
            attempt_timeout: config.attempt_timeout,
            session_timeout: config.session_timeout,
            matcher: config.matcher,
            program: config.program,
            args: config.args,
            clock,
            effectiveness,
        }
    }

    pub async fn run(&self) -> Result<SessionOutcome> {
        let session_start = Instant::now();
        let mut history: Vec<SystemTime> = Vec::new();
        let mut last_chosen_delay = Duration::ZERO;
        let mut last_exit_code: Option<i32> = None;
        let mut n: i64 = 1;

        loop {
            self.await_schedule_or_timeout(session_start, &history).await?;

            if self.session_budget_exhausted(session_start) {
                return Err(self.session_timeout_error(session_start, last_exit_code));
            }

            history.push(self.clock.now());

            debug!(attempt = n, "invoking child");
            let captured = ChildProcess::run(&self.program, &self.args, self.attempt_timeout).await?;
            last_exit_code = Some(captured.exit_code);

            if let Some(observing) = self.strategy.as_observing() {
                observing.observe(&captured.stdout, &captured.stderr, captured.exit_code);
            }

            let combined = format!("{}\n{}", captured.stdout, captured.stderr);
            let success = !captured.timed_out && self.matcher.verdict(&combined, captured.exit_code);
            if captured.timed_out {
                warn!(attempt = n, "attempt timed out");
            }

            self.effectiveness.record(self.strategy.name(), success, last_chosen_delay);
            if let Some(learning) = self.strategy.as_learning() {
                learning.record_outcome(last_chosen_delay, success, captured.elapsed);
            }

            if success || n == i64::from(self.attempts) {
                return Ok(SessionOutcome {
                    exit_code: captured.exit_code,
                    succeeded: success,
                    attempts_made: n as u32,
                });
            }

            let delay = self.strategy.delay(n);
            last_chosen_delay = delay;
            debug!(attempt = n, ?delay, "sleeping before next attempt");
            self.sleep_within_budget(session_start, delay).await?;
            if self.session_budget_exhausted(session_start) {
                return Err(self.session_timeout_error(session_start, last_exit_code));
            }

            n += 1;
        }
    }

    async fn await_schedule_or_timeout(&self, session_start: Instant, history: &[SystemTime]) -> Result<()> {
        let Some(scheduler) = self.strategy.as_scheduling() else {
            return Ok(());
        };
        loop {
            let now = self.clock.now();
            if scheduler.can_schedule(history, now) {
                return Ok(());
            }
            if self.session_budget_exhausted(session_start) {
                return Err(PatienceError::ScheduleInfeasible);
            }
            tokio::time::sleep(self.bounded_poll_interval(session_start)).await;
        }
    }

    fn bounded_poll_interval(&self, session_start: Instant) -> Duration {
        if self.session_timeout.is_zero() {
            return SCHEDULE_POLL_INTERVAL;
        }
        let remaining = self.session_timeout.saturating_sub(session_start.elapsed());
        remaining.min(SCHEDULE_POLL_INTERVAL)
    }

    async fn sleep_within_budget(&self, session_start: Instant, delay: Duration) -> Result<()> {
        if self.session_timeout.is_zero() {
            tokio::time::sleep(delay).await;
            return Ok(());
        }
        let remaining = self.session_timeout.saturating_sub(session_start.elapsed());
        tokio::time::sleep(delay.min(remaining)).await;
        Ok(())
    }

    fn session_budget_exhausted(&self, session_start: Instant) -> bool {
        !self.session_timeout.is_zero() && session_start.elapsed() >= self.session_timeout
    }

    fn session_timeout_error(&self, session_start: Instant, last_exit_code: Option<i32>) -> PatienceError {
        PatienceError::SessionTimeout {
            elapsed: session_start.elapsed(),
            last_exit_code,
        }
    }
}
