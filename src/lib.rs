//! `patience_core`: the delay-scheduling core of a command-line retry
//! engine.
//!
//! The library never performs I/O, owns a child process, or enforces
//! the wall clock itself — see [`strategy`] for the backoff strategies,
//! [`http_parser`] for the HTTP-aware response parser, and
//! [`effectiveness`] for per-strategy bookkeeping. The binary's
//! [`runner`] is the one piece that actually drives those components
//! against a real child process.

pub mod api_selector;
pub mod child;
pub mod cli;
pub mod clock;
pub mod config;
pub mod duration_math;
pub mod effectiveness;
pub mod error;
pub mod http_parser;
pub mod outcome;
pub mod pattern;
pub mod rng;
pub mod runner;
pub mod strategy;

pub use error::{PatienceError, Result};
pub use outcome::Outcome;
pub use strategy::{Attempt, Learning, Observing, Scheduling, Strategy};
