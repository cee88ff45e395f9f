//! Extracts server-specified retry timing from a child process's
//! captured output.
//!
//! This never surfaces an error: malformed input is a
//! [`PatienceError::ParseSoftError`]-shaped situation the spec forbids
//! from ever reaching a caller, so failure to parse anything is
//! represented purely by returning `None` / falling through to the next
//! precedence tier.

use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;

use crate::clock::Clock;

/// Where a parsed retry hint came from. Retained for diagnostics; only
/// `retry_after` on [`ParsedHint`] affects scheduling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HintSource {
    Header,
    RateLimitHeader,
    RateLimitReset,
    JsonField,
    None,
}

/// The result of scanning a blob of child output for retry timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedHint {
    pub retry_after: Option<Duration>,
    pub source: HintSource,
}

impl ParsedHint {
    fn none() -> Self {
        Self {
            retry_after: None,
            source: HintSource::None,
        }
    }
}

/// Caps each stream to this many bytes before parsing, bounding work on
/// adversarially large child output.
const MAX_STREAM_BYTES: usize = 10 * 1024;

const JSON_FIELDS: [&str; 5] = [
    "retry_after",
    "retry_after_seconds",
    "retryAfter",
    "retryAfterSeconds",
    "retry_in",
];

fn retry_after_header_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?im)^retry-after:\s*([0-9]+)\s*\r?$").unwrap())
}

fn rate_limit_retry_after_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?im)^x-ratelimit-retry-after:\s*([0-9]+)\s*\r?$").unwrap())
}

fn rate_limit_reset_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?im)^x-ratelimit-reset:\s*([0-9]+)\s*\r?$").unwrap())
}

fn truncate_utf8(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Parse `stdout`/`stderr` (treated as a single blob, concatenated with a
/// newline) for a server-specified retry delay, in the strict precedence
/// order the header/JSON scan documents. `clock` supplies "now" for the
/// `X-RateLimit-Reset` epoch calculation.
///
/// Pure, total, and never panics: an unparseable or hint-free input
/// yields `ParsedHint { retry_after: None, source: HintSource::None }`.
pub fn parse_retry_hint(stdout: &str, stderr: &str, clock: &dyn Clock) -> ParsedHint {
    let stdout = truncate_utf8(stdout, MAX_STREAM_BYTES);
    let stderr = truncate_utf8(stderr, MAX_STREAM_BYTES);
    let blob = format!("{stdout}\n{stderr}");

    if let Some(caps) = retry_after_header_re().captures(&blob) {
        if let Ok(secs) = caps[1].parse::<u64>() {
            return ParsedHint {
                retry_after: Some(Duration::from_secs(secs)),
                source: HintSource::Header,
            };
        }
    }

    if let Some(caps) = rate_limit_retry_after_re().captures(&blob) {
        if let Ok(secs) = caps[1].parse::<u64>() {
            return ParsedHint {
                retry_after: Some(Duration::from_secs(secs)),
                source: HintSource::RateLimitHeader,
            };
        }
    }

    if let Some(caps) = rate_limit_reset_re().captures(&blob) {
        if let Ok(reset_epoch) = caps[1].parse::<i64>() {
            if let Some(delay) = reset_delay(reset_epoch, clock) {
                return ParsedHint {
                    retry_after: Some(delay),
                    source: HintSource::RateLimitReset,
                };
            }
        }
    }

    if let Some(delay) = scan_json_hint(&blob) {
        return ParsedHint {
            retry_after: Some(delay),
            source: HintSource::JsonField,
        };
    }

    ParsedHint::none()
}

fn reset_delay(reset_epoch: i64, clock: &dyn Clock) -> Option<Duration> {
    let now_epoch = clock
        .now()
        .duration_since(std::time::UNIX_EPOCH)
        .ok()?
        .as_secs() as i64;
    let delta = reset_epoch - now_epoch;
    if delta > 0 {
        Some(Duration::from_secs(delta as u64))
    } else {
        None
    }
}

/// Scan `blob` for balanced `{...}` objects (tracking string/escape
/// state so braces inside string literals don't confuse the matcher),
/// parse each as JSON in order of appearance, and return the first
/// recognised retry field's value from the first object that has one.
fn scan_json_hint(blob: &str) -> Option<Duration> {
    for candidate in balanced_json_objects(blob) {
        let Ok(value) = serde_json::from_str::<serde_json::Value>(candidate) else {
            continue;
        };
        let serde_json::Value::Object(map) = value else {
            continue;
        };
        for field in JSON_FIELDS {
            let Some(v) = map.get(field) else {
                continue;
            };
            if let Some(secs) = v.as_f64() {
                if secs.is_finite() && secs >= 0.0 {
                    return Some(Duration::from_secs_f64(secs));
                }
                continue;
            }
            if let Some(s) = v.as_str() {
                if let Ok(secs) = s.trim().parse::<i64>() {
                    if secs >= 0 {
                        return Some(Duration::from_secs(secs as u64));
                    }
                }
            }
        }
    }
    None
}

fn balanced_json_objects(blob: &str) -> Vec<&str> {
    let bytes = blob.as_bytes();
    let mut objects = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => {
                if depth == 0 {
                    start = i;
                }
                depth += 1;
            }
            b'}' => {
                if depth > 0 {
                    depth -= 1;
                    if depth == 0 {
                        objects.push(&blob[start..=i]);
                    }
                }
            }
            _ => {}
        }
    }
    objects
}
