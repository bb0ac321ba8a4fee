//! Infrastructure error mapping
//!
//! Adapter-level failures are folded into the domain error taxonomy at
//! the crate boundary; nothing above infra sees a reqwest or rusqlite
//! type.

use plansync_domain::PlansyncError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InfraError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("database error: {0}")]
    Sql(#[from] rusqlite::Error),

    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<InfraError> for PlansyncError {
    fn from(err: InfraError) -> Self {
        match err {
            InfraError::Http(inner) => PlansyncError::Network(inner.to_string()),
            InfraError::Sql(inner) => PlansyncError::Database(inner.to_string()),
            InfraError::Pool(inner) => PlansyncError::Database(inner.to_string()),
            InfraError::Join(inner) => {
                if inner.is_cancelled() {
                    PlansyncError::Internal("blocking task cancelled".into())
                } else {
                    PlansyncError::Internal(format!("blocking task failed: {inner}"))
                }
            }
            InfraError::Io(inner) => PlansyncError::Internal(inner.to_string()),
        }
    }
}
