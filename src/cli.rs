//! Command-line surface: a strategy subcommand, its own flags, a
//! universal block of common flags, `--`, and the child command.

use clap::{Args, Parser, Subcommand};

/// Flags shared by every strategy subcommand.
#[derive(Args, Debug, Clone)]
pub struct CommonFlags {
    /// Attempt budget, 1..=1000.
    #[arg(long, env = "PATIENCE_ATTEMPTS", default_value_t = 3)]
    pub attempts: u32,

    /// Per-attempt wall-clock cap (e.g. "500ms", "2s"). "0s" disables it.
    #[arg(long, env = "PATIENCE_TIMEOUT", default_value = "0s")]
    pub timeout: String,

    /// Whole-session wall-clock cap. "0s" disables it.
    #[arg(long, env = "PATIENCE_SESSION_TIMEOUT", default_value = "0s")]
    pub session_timeout: String,

    /// Regex a successful attempt's combined output must match.
    #[arg(long, env = "PATIENCE_SUCCESS_PATTERN")]
    pub success_pattern: Option<String>,

    /// Regex a failed attempt's combined output must match.
    #[arg(long, env = "PATIENCE_FAILURE_PATTERN")]
    pub failure_pattern: Option<String>,

    /// Match success/failure patterns case-insensitively.
    #[arg(long, env = "PATIENCE_CASE_INSENSITIVE")]
    pub case_insensitive: bool,

    /// Caps the strategy's output regardless of its native cap.
    #[arg(long, env = "PATIENCE_MAX_DELAY")]
    pub max_delay: Option<String>,

    /// Enable debug logging.
    #[arg(long, env = "PATIENCE_DEBUG")]
    pub debug: bool,

    /// The child command and its arguments, after `--`.
    #[arg(last = true, required = true)]
    pub child: Vec<String>,
}

/// Flags describing a fallback strategy, reused by `http-aware` and
/// `adaptive` (whose fallback may be any deterministic or randomised
/// strategy).
#[derive(Args, Debug, Clone, Default)]
pub struct FallbackFlags {
    /// Which strategy `--fallback` names.
    #[arg(long, default_value = "fixed")]
    pub fallback: String,

    #[arg(long)]
    pub delay: Option<String>,

    #[arg(long)]
    pub increment: Option<String>,

    #[arg(long)]
    pub base_delay: Option<String>,

    #[arg(long)]
    pub multiplier: Option<f64>,

    #[arg(long)]
    pub exponent: Option<f64>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum StrategyCommand {
    /// Always waits the same amount of time between attempts.
    Fixed {
        #[arg(long)]
        delay: String,
        #[command(flatten)]
        common: CommonFlags,
    },

    /// Delay grows by a fixed increment each attempt.
    Linear {
        #[arg(long)]
        increment: String,
        #[command(flatten)]
        common: CommonFlags,
    },

    /// Delay doubles (or multiplies by any base) each attempt.
    Exponential {
        #[arg(long)]
        base_delay: String,
        #[arg(long)]
        multiplier: f64,
        #[command(flatten)]
        common: CommonFlags,
    },

    /// Full Jitter: uniform draw in `[0, cap]`.
    Jitter {
        #[arg(long)]
        base_delay: String,
        #[arg(long)]
        multiplier: f64,
        #[command(flatten)]
        common: CommonFlags,
    },

    /// Decorrelated Jitter: grows off the previously chosen delay.
    #[command(name = "decorrelated-jitter")]
    DecorrelatedJitter {
        #[arg(long)]
        base_delay: String,
        #[arg(long)]
        multiplier: f64,
        #[command(flatten)]
        common: CommonFlags,
    },

    /// Delay follows the Fibonacci sequence scaled by a unit duration.
    Fibonacci {
        #[arg(long)]
        base_delay: String,
        #[command(flatten)]
        common: CommonFlags,
    },

    /// Delay grows as the attempt index raised to a configurable exponent.
    Polynomial {
        #[arg(long)]
        base_delay: String,
        #[arg(long)]
        exponent: f64,
        #[command(flatten)]
        common: CommonFlags,
    },

    /// Wraps a fallback strategy and honours server-specified retry timing.
    #[command(name = "http-aware")]
    HttpAware {
        #[arg(long, default_value = "0s")]
        max_retry_after: String,
        #[command(flatten)]
        fallback: FallbackFlags,
        #[command(flatten)]
        common: CommonFlags,
    },

    /// Proactive rate-limit scheduling with a Diophantine feasibility check.
    Diophantine {
        #[arg(long)]
        limit: u32,
        #[arg(long)]
        window: String,
        /// Comma-separated retry offsets, e.g. "0s,5m".
        #[arg(long, default_value = "0s")]
        retry_offsets: String,
        #[command(flatten)]
        common: CommonFlags,
    },

    /// Learns delays from observed success/failure history.
    Adaptive {
        #[arg(long)]
        learning_rate: f64,
        #[arg(long)]
        memory_window: usize,
        #[command(flatten)]
        fallback: FallbackFlags,
        #[command(flatten)]
        common: CommonFlags,
    },
}

impl StrategyCommand {
    pub fn common(&self) -> &CommonFlags {
        match self {
            StrategyCommand::Fixed { common, .. }
            | StrategyCommand::Linear { common, .. }
            | StrategyCommand::Exponential { common, .. }
            | StrategyCommand::Jitter { common, .. }
            | StrategyCommand::DecorrelatedJitter { common, .. }
            | StrategyCommand::Fibonacci { common, .. }
            | StrategyCommand::Polynomial { common, .. }
            | StrategyCommand::HttpAware { common, .. }
            | StrategyCommand::Diophantine { common, .. }
            | StrategyCommand::Adaptive { common, .. } => common,
        }
    }
}

#[derive(Parser, Debug, Clone)]
#[command(name = "patience", version, about = "Retries a command with a configurable backoff strategy")]
pub struct Cli {
    #[command(subcommand)]
    pub strategy: StrategyCommand,
}
