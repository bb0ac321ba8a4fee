//! Remote spreadsheet service integration
//!
//! - **Client**: [`RemoteSheetClient`] — reqwest adapter for the
//!   spreadsheet API, every call wrapped in bounded-backoff retry and
//!   the process-local idempotency guard
//! - **Types**: request/response DTOs in the remote service's casing

mod client;
mod types;

pub use client::RemoteSheetClient;
