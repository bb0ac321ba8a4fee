//! Cross-cutting machinery shared across Plansync crates.
//!
//! This crate has no domain knowledge. It provides:
//! - `retry`: a generic retry executor with pluggable backoff and policies
//! - `dedupe`: a process-local idempotency guard for in-flight operations

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

pub mod dedupe;
pub mod retry;

pub use dedupe::{DedupeError, DedupeGuard, DedupeTicket};
pub use retry::{
    BackoffStrategy, Jitter, RetryConfig, RetryDecision, RetryError, RetryExecutor, RetryPolicy,
};
