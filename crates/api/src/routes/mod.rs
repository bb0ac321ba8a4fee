//! HTTP routes - thin adapters over the core services

mod audit;
mod health;
mod sync;
mod tree;
mod webhook;

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use plansync_domain::PlansyncError;

use crate::context::AppContext;

/// Error wrapper translating the domain taxonomy onto HTTP status codes.
pub struct ApiError(PlansyncError);

impl From<PlansyncError> for ApiError {
    fn from(err: PlansyncError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            PlansyncError::Validation(_) | PlansyncError::CycleDetected(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            PlansyncError::NotFound(_) => StatusCode::NOT_FOUND,
            PlansyncError::IdempotencyConflict(_) => StatusCode::CONFLICT,
            // Upstream trouble: the remote service rejected or throttled us.
            PlansyncError::Auth(_) | PlansyncError::PartialProvisioning { .. } => {
                StatusCode::BAD_GATEWAY
            }
            PlansyncError::RateLimited(_) => StatusCode::SERVICE_UNAVAILABLE,
            PlansyncError::Database(_)
            | PlansyncError::Network(_)
            | PlansyncError::Config(_)
            | PlansyncError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self.0)).into_response()
    }
}

pub type ApiResult<T> = Result<Json<T>, ApiError>;

pub fn build_router(context: Arc<AppContext>) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/sync", post(sync::full_sync))
        .route("/provision-check", post(sync::provision_check))
        .route("/projects/{id}/tree", get(tree::get_tree).post(tree::save_tree))
        .route("/projects/{id}/cache", delete(tree::clear_cache))
        .route("/webhook", post(webhook::receive))
        .route("/audit", get(audit::tail))
        .with_state(context)
}
