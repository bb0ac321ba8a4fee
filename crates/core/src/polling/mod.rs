//! Polling fallback

mod service;

pub use service::{PollSummary, PollingService};
