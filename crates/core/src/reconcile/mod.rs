//! Cache/remote reconciliation

pub mod ports;
mod service;

pub use service::Reconciler;
