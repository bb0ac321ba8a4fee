//! Health surface

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::Serialize;

use crate::context::AppContext;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: bool,
    /// Seconds since the most recent successful project sync, if any.
    pub last_sync_age_seconds: Option<i64>,
}

pub async fn health(State(context): State<Arc<AppContext>>) -> Json<HealthResponse> {
    let database = context.db.health_check().is_ok();

    let last_sync_age_seconds = match context.projects.list_projects().await {
        Ok(projects) => projects
            .iter()
            .filter_map(|project| project.last_synced_at)
            .max()
            .map(|ts| (Utc::now() - ts).num_seconds()),
        Err(_) => None,
    };

    let status = if database { "ok" } else { "degraded" };
    Json(HealthResponse { status, database, last_sync_age_seconds })
}
