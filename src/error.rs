//! The core's error taxonomy.
//!
//! `ParseSoftError` from spec §7 has no variant here on purpose: the HTTP
//! response parser (C4) never surfaces malformed input as an error, it
//! just returns `None` and lets the fallback strategy take over. Giving it
//! an enum variant would invite callers to match on it and accidentally
//! surface it.

use thiserror::Error;

/// Errors produced by the retry core and its runner.
#[derive(Error, Debug)]
pub enum PatienceError {
    /// An invalid strategy parameter, duration, regex, or out-of-range
    /// flag. Fatal; the session never starts.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The child process could not be launched at all (missing binary,
    /// permission denied). Fatal — retrying cannot help.
    #[error("failed to launch child process: {0}")]
    ChildExec(#[from] std::io::Error),

    /// The wall-clock session budget elapsed while waiting between
    /// attempts or for a proactive scheduler to admit the next request.
    #[error("session timeout after {elapsed:?}")]
    SessionTimeout {
        /// How long the session had been running when it was aborted.
        elapsed: std::time::Duration,
        /// The last captured attempt output, if any attempt completed.
        last_exit_code: Option<i32>,
    },

    /// The Diophantine predicate could not be satisfied within the
    /// session's scheduling budget.
    #[error("no feasible schedule within the rate-limit window")]
    ScheduleInfeasible,
}

impl From<regex::Error> for PatienceError {
    fn from(err: regex::Error) -> Self {
        PatienceError::Configuration(format!("invalid pattern: {err}"))
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, PatienceError>;
