//! Error types used throughout the application

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for Plansync
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum PlansyncError {
    /// Remote credential rejected (401/403). Never retried.
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Remote rate limit (429) survived the full retry budget.
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Remote object deleted out-of-band. Callers invalidate the stale
    /// reference instead of failing hard.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed local input, rejected before any remote call.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Two items reference each other as parents.
    #[error("Cycle detected in hierarchy at item {0}")]
    CycleDetected(String),

    /// A duplicate of this operation is already in flight.
    #[error("Duplicate in-flight operation: {0}")]
    IdempotencyConflict(String),

    /// A provisioning step failed; earlier steps are not rolled back.
    #[error("Provisioning step '{step}' failed: {message}")]
    PartialProvisioning { step: String, message: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for Plansync operations
pub type Result<T> = std::result::Result<T, PlansyncError>;

impl PlansyncError {
    /// Stable label suitable for structured logging.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Auth(_) => "auth",
            Self::RateLimited(_) => "rate_limited",
            Self::NotFound(_) => "not_found",
            Self::Validation(_) => "validation",
            Self::CycleDetected(_) => "cycle_detected",
            Self::IdempotencyConflict(_) => "idempotency_conflict",
            Self::PartialProvisioning { .. } => "partial_provisioning",
            Self::Database(_) => "database",
            Self::Network(_) => "network",
            Self::Config(_) => "config",
            Self::Internal(_) => "internal",
        }
    }
}
