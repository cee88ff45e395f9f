//! Turns parsed CLI flags into a ready-to-run session: a constructed
//! [`Strategy`], the attempt/timeout budget, and a [`PatternMatcher`].

use std::sync::Arc;
use std::time::Duration;

use crate::cli::{CommonFlags, FallbackFlags, StrategyCommand};
use crate::clock::{SharedClock, SystemClock};
use crate::error::{PatienceError, Result};
use crate::pattern::PatternMatcher;
use crate::rng::{RandomSource, ThreadRandom};
use crate::strategy::{
    AdaptiveLearner, DecorrelatedJitter, Diophantine, Exponential, Fibonacci, Fixed, FullJitter,
    HttpAware, Linear, Polynomial, RateLimitDescriptor, Strategy,
};

/// Everything the runner needs for one session.
pub struct SessionConfig {
    pub strategy: Box<dyn Strategy>,
    pub attempts: u32,
    pub attempt_timeout: Duration,
    pub session_timeout: Duration,
    pub matcher: PatternMatcher,
    pub program: String,
    pub args: Vec<String>,
    pub debug: bool,
}

fn parse_duration(flag: &str, value: &str) -> Result<Duration> {
    humantime::parse_duration(value)
        .map_err(|e| PatienceError::Configuration(format!("invalid duration for --{flag}: {e}")))
}

fn parse_optional_duration(flag: &str, value: &Option<String>) -> Result<Duration> {
    match value {
        Some(v) => parse_duration(flag, v),
        None => Ok(Duration::ZERO),
    }
}

fn validate_attempts(attempts: u32) -> Result<()> {
    if (1..=1000).contains(&attempts) {
        Ok(())
    } else {
        Err(PatienceError::Configuration(
            "--attempts must be in [1, 1000]".into(),
        ))
    }
}

fn split_child(child: &[String]) -> Result<(String, Vec<String>)> {
    let (program, args) = child
        .split_first()
        .ok_or_else(|| PatienceError::Configuration("no child command given after --".into()))?;
    Ok((program.clone(), args.to_vec()))
}

fn build_matcher(common: &CommonFlags) -> Result<PatternMatcher> {
    PatternMatcher::new(
        common.success_pattern.as_deref(),
        common.failure_pattern.as_deref(),
        common.case_insensitive,
    )
}

fn random_source() -> Box<dyn RandomSource> {
    Box::new(ThreadRandom::new())
}

fn build_fallback(flags: &FallbackFlags, max_delay: Duration) -> Result<Box<dyn Strategy>> {
    match flags.fallback.as_str() {
        "fixed" => {
            let delay = flags
                .delay
                .as_deref()
                .ok_or_else(|| PatienceError::Configuration("fallback=fixed requires --delay".into()))?;
            Ok(Box::new(Fixed::new(parse_duration("delay", delay)?)))
        }
        "linear" => {
            let increment = flags.increment.as_deref().ok_or_else(|| {
                PatienceError::Configuration("fallback=linear requires --increment".into())
            })?;
            Ok(Box::new(Linear::new(parse_duration("increment", increment)?, max_delay)))
        }
        "exponential" => {
            let base = flags.base_delay.as_deref().ok_or_else(|| {
                PatienceError::Configuration("fallback=exponential requires --base-delay".into())
            })?;
            let multiplier = flags.multiplier.ok_or_else(|| {
                PatienceError::Configuration("fallback=exponential requires --multiplier".into())
            })?;
            Ok(Box::new(Exponential::new(
                parse_duration("base-delay", base)?,
                multiplier,
                max_delay,
            )?))
        }
        "fibonacci" => {
            let base = flags.base_delay.as_deref().ok_or_else(|| {
                PatienceError::Configuration("fallback=fibonacci requires --base-delay".into())
            })?;
            Ok(Box::new(Fibonacci::new(parse_duration("base-delay", base)?, max_delay)?))
        }
        "polynomial" => {
            let base = flags.base_delay.as_deref().ok_or_else(|| {
                PatienceError::Configuration("fallback=polynomial requires --base-delay".into())
            })?;
            let exponent = flags.exponent.ok_or_else(|| {
                PatienceError::Configuration("fallback=polynomial requires --exponent".into())
            })?;
            let max = if max_delay.is_zero() {
                return Err(PatienceError::Configuration(
                    "fallback=polynomial requires a nonzero --max-delay".into(),
                ));
            } else {
                max_delay
            };
            Ok(Box::new(Polynomial::new(parse_duration("base-delay", base)?, exponent, max)?))
        }
        "jitter" => {
            let base = flags.base_delay.as_deref().ok_or_else(|| {
                PatienceError::Configuration("fallback=jitter requires --base-delay".into())
            })?;
            let multiplier = flags.multiplier.ok_or_else(|| {
                PatienceError::Configuration("fallback=jitter requires --multiplier".into())
            })?;
            Ok(Box::new(FullJitter::new(
                parse_duration("base-delay", base)?,
                multiplier,
                max_delay,
                random_source(),
            )?))
        }
        "decorrelated-jitter" => {
            let base = flags.base_delay.as_deref().ok_or_else(|| {
                PatienceError::Configuration("fallback=decorrelated-jitter requires --base-delay".into())
            })?;
            let multiplier = flags.multiplier.ok_or_else(|| {
                PatienceError::Configuration("fallback=decorrelated-jitter requires --multiplier".into())
            })?;
            Ok(Box::new(DecorrelatedJitter::new(
                parse_duration("base-delay", base)?,
                multiplier,
                max_delay,
                random_source(),
            )?))
        }
        other => Err(PatienceError::Configuration(format!(
            "unknown fallback strategy: {other}"
        ))),
    }
}

fn parse_retry_offsets(value: &str) -> Result<Vec<Duration>> {
    let mut offsets = Vec::new();
    for part in value.split(',') {
        offsets.push(parse_duration("retry-offsets", part.trim())?);
    }
    if offsets.first().copied() != Some(Duration::ZERO) {
        offsets.insert(0, Duration::ZERO);
    }
    Ok(offsets)
}

/// Construct the strategy named by the subcommand, plus the shared
/// clock used both by it (if it needs one) and the session.
fn build_strategy(strategy: &StrategyCommand, clock: SharedClock) -> Result<Box<dyn Strategy>> {
    let max_delay = parse_optional_duration("max-delay", &strategy.common().max_delay)?;

    match strategy {
        StrategyCommand::Fixed { delay, .. } => Ok(Box::new(Fixed::new(parse_duration("delay", delay)?))),
        StrategyCommand::Linear { increment, .. } => {
            Ok(Box::new(Linear::new(parse_duration("increment", increment)?, max_delay)))
        }
        StrategyCommand::Exponential { base_delay, multiplier, .. } => Ok(Box::new(Exponential::new(
            parse_duration("base-delay", base_delay)?,
            *multiplier,
            max_delay,
        )?)),
        StrategyCommand::Jitter { base_delay, multiplier, .. } => Ok(Box::new(FullJitter::new(
            parse_duration("base-delay", base_delay)?,
            *multiplier,
            max_delay,
            random_source(),
        )?)),
        StrategyCommand::DecorrelatedJitter { base_delay, multiplier, .. } => {
            Ok(Box::new(crate::strategy::DecorrelatedJitter::new(
                parse_duration("base-delay", base_delay)?,
                *multiplier,
                max_delay,
                random_source(),
            )?))
        }
        StrategyCommand::Fibonacci { base_delay, .. } => {
            Ok(Box::new(Fibonacci::new(parse_duration("base-delay", base_delay)?, max_delay)?))
        }
        StrategyCommand::Polynomial { base_delay, exponent, .. } => {
            let max = if max_delay.is_zero() {
                return Err(PatienceError::Configuration(
                    "polynomial requires a nonzero --max-delay".into(),
                ));
            } else {
                max_delay
            };
            Ok(Box::new(Polynomial::new(parse_duration("base-delay", base_delay)?, *exponent, max)?))
        }
        StrategyCommand::HttpAware { max_retry_after, fallback, .. } => {
            let fallback_strategy = build_fallback(fallback, max_delay)?;
            Ok(Box::new(HttpAware::new(
                fallback_strategy,
                parse_duration("max-retry-after", max_retry_after)?,
                clock,
            )))
        }
        StrategyCommand::Diophantine { limit, window, retry_offsets, .. } => {
            Ok(Box::new(Diophantine::new(RateLimitDescriptor {
                limit: *limit,
                window: parse_duration("window", window)?,
                retry_offsets: parse_retry_offsets(retry_offsets)?,
            })))
        }
        StrategyCommand::Adaptive { learning_rate, memory_window, fallback, .. } => {
            let fallback_strategy = build_fallback(fallback, max_delay)?;
            Ok(Box::new(AdaptiveLearner::new(
                fallback_strategy,
                *learning_rate,
                *memory_window,
            )?))
        }
    }
}

/// Build a complete session from parsed CLI flags.
pub fn build_session(strategy_command: &StrategyCommand) -> Result<SessionConfig> {
    let common = strategy_command.common();
    validate_attempts(common.attempts)?;

    let clock: SharedClock = Arc::new(SystemClock);
    let strategy = build_strategy(strategy_command, clock)?;
    let matcher = build_matcher(common)?;
    let (program, args) = split_child(&common.child)?;

    Ok(SessionConfig {
        strategy,
        attempts: common.attempts,
        attempt_timeout: parse_duration("timeout", &common.timeout)?,
        session_timeout: parse_duration("session-timeout", &common.session_timeout)?,
        matcher,
        program,
        args,
        debug: common.debug,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    #[test]
    fn builds_fixed_session() {
        let cli = Cli::parse_from(["patience", "fixed", "--delay", "100ms", "--", "echo", "hi"]);
        let session = build_session(&cli.strategy).unwrap();
        assert_eq!(session.attempts, 3);
        assert_eq!(session.program, "echo");
        assert_eq!(session.args, vec!["hi".to_string()]);
    }

    #[test]
    fn rejects_attempts_out_of_range() {
        let cli = Cli::parse_from([
            "patience", "fixed", "--delay", "100ms", "--attempts", "0", "--", "echo",
        ]);
        assert!(build_session(&cli.strategy).is_err());
    }

    #[test]
    fn polynomial_requires_max_delay() {
        let cli = Cli::parse_from([
            "patience", "polynomial", "--base-delay", "100ms", "--exponent", "2.0", "--", "echo",
        ]);
        assert!(build_session(&cli.strategy).is_err());
    }

    #[test]
    fn builds_http_aware_with_fixed_fallback() {
        let cli = Cli::parse_from([
            "patience",
            "http-aware",
            "--max-retry-after",
            "10s",
            "--fallback",
            "fixed",
            "--delay",
            "1s",
            "--",
            "echo",
        ]);
        let session = build_session(&cli.strategy).unwrap();
        assert_eq!(session.strategy.name(), "http-aware");
    }

    #[test]
    fn builds_adaptive_with_jitter_fallback() {
        let cli = Cli::parse_from([
            "patience",
            "adaptive",
            "--learning-rate",
            "0.3",
            "--memory-window",
            "100",
            "--fallback",
            "jitter",
            "--base-delay",
            "1s",
            "--multiplier",
            "2.0",
            "--",
            "echo",
        ]);
        let session = build_session(&cli.strategy).unwrap();
        assert_eq!(session.strategy.name(), "adaptive");
    }

    #[test]
    fn builds_http_aware_with_decorrelated_jitter_fallback() {
        let cli = Cli::parse_from([
            "patience",
            "http-aware",
            "--max-retry-after",
            "10s",
            "--fallback",
            "decorrelated-jitter",
            "--base-delay",
            "1s",
            "--multiplier",
            "3.0",
            "--",
            "echo",
        ]);
        let session = build_session(&cli.strategy).unwrap();
        assert_eq!(session.strategy.name(), "http-aware");
    }
}
