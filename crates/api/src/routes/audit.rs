//! Audit trail read endpoint

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use plansync_domain::AuditEntry;
use serde::Deserialize;

use super::ApiResult;
use crate::context::AppContext;

const DEFAULT_LIMIT: usize = 50;
const MAX_LIMIT: usize = 500;

#[derive(Debug, Deserialize)]
pub struct AuditQuery {
    pub limit: Option<usize>,
}

/// Most recent audit entries, newest first.
pub async fn tail(
    State(context): State<Arc<AppContext>>,
    Query(query): Query<AuditQuery>,
) -> ApiResult<Vec<AuditEntry>> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
    let entries = context.audit.recent(limit).await?;
    Ok(Json(entries))
}
