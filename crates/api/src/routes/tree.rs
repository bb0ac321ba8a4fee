//! Breakdown-structure read/save/clear

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use plansync_core::Hierarchy;
use plansync_domain::{PlansyncError, SyncReport, WbsItem};
use serde::Serialize;

use super::ApiResult;
use crate::context::AppContext;

async fn require_project(context: &AppContext, project_id: &str) -> Result<(), PlansyncError> {
    context
        .projects
        .get_project(project_id)
        .await?
        .map(|_| ())
        .ok_or_else(|| PlansyncError::NotFound(format!("project {project_id}")))
}

/// Current state: the tree rebuilt from the cache, codes and rollups
/// freshly computed.
pub async fn get_tree(
    State(context): State<Arc<AppContext>>,
    Path(project_id): Path<String>,
) -> ApiResult<Hierarchy> {
    require_project(&context, &project_id).await?;
    let tree = context.reconciler.load_tree(&project_id).await?;
    Ok(Json(tree))
}

/// Save an edited tree: the flat pre-order list the UI produced.
pub async fn save_tree(
    State(context): State<Arc<AppContext>>,
    Path(project_id): Path<String>,
    Json(items): Json<Vec<WbsItem>>,
) -> ApiResult<SyncReport> {
    let report = context.reconciler.save_tree(&project_id, items).await?;
    Ok(Json(report))
}

#[derive(Debug, Serialize)]
pub struct ClearCacheResponse {
    pub removed: usize,
}

pub async fn clear_cache(
    State(context): State<Arc<AppContext>>,
    Path(project_id): Path<String>,
) -> ApiResult<ClearCacheResponse> {
    require_project(&context, &project_id).await?;
    let removed = context.reconciler.clear_cache(&project_id).await?;
    Ok(Json(ClearCacheResponse { removed }))
}
