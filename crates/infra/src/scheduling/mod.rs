//! Background scheduling

mod poll_scheduler;

pub use poll_scheduler::{PollScheduler, PollSchedulerConfig};
