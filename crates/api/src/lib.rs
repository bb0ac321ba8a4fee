//! # Plansync API
//!
//! Thin HTTP surface over the core services. Handlers adapt requests to
//! the reconciler, provisioning workflow, and polling service; no
//! business logic lives here.

pub mod context;
pub mod logging;
pub mod routes;

pub use context::AppContext;
pub use routes::build_router;
