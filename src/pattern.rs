//! Success/failure verdict matching against a child's captured output.
//!
//! Out of the core's scope per §1 — the core only needs the resulting
//! verdict — but the binary needs somewhere to compute it.

use regex::{Regex, RegexBuilder};

use crate::error::{PatienceError, Result};

/// Matches a child's combined stdout+stderr against configured
/// success/failure patterns to produce a verdict.
///
/// Precedence: a matching success pattern always wins, even over a
/// nonzero exit code (see the literal pattern-match scenario). A
/// matching failure pattern wins next. If neither configured pattern
/// matches — including when neither is configured at all — the exit
/// code decides.
pub struct PatternMatcher {
    success_pattern: Option<Regex>,
    failure_pattern: Option<Regex>,
}

impl PatternMatcher {
    pub fn new(
        success_pattern: Option<&str>,
        failure_pattern: Option<&str>,
        case_insensitive: bool,
    ) -> Result<Self> {
        let compile = |pattern: &str| -> Result<Regex> {
            RegexBuilder::new(pattern)
                .case_insensitive(case_insensitive)
                .build()
                .map_err(PatienceError::from)
        };
        Ok(Self {
            success_pattern: success_pattern.map(compile).transpose()?,
            failure_pattern: failure_pattern.map(compile).transpose()?,
        })
    }

    /// `true` means success.
    pub fn verdict(&self, combined_output: &str, exit_code: i32) -> bool {
        if let Some(re) = &self.success_pattern {
            if re.is_match(combined_output) {
                return true;
            }
        }
        if let Some(re) = &self.failure_pattern {
            if re.is_match(combined_output) {
                return false;
            }
        }
        exit_code == 0
    }
}
