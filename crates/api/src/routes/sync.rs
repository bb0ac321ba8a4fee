//! Sync and provisioning triggers

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use plansync_core::PollSummary;
use serde::Serialize;
use tracing::warn;

use super::ApiResult;
use crate::context::AppContext;

/// Manual full sync: one polling pass over the portfolio sheet.
pub async fn full_sync(State(context): State<Arc<AppContext>>) -> ApiResult<PollSummary> {
    let summary = context.polling.run_once().await?;
    Ok(Json(summary))
}

#[derive(Debug, Default, Serialize)]
pub struct ProvisionCheckResponse {
    pub checked: usize,
    pub provisioned: Vec<String>,
    pub failed: Vec<ProvisionFailure>,
}

#[derive(Debug, Serialize)]
pub struct ProvisionFailure {
    pub project_id: String,
    pub message: String,
}

/// Run the provisioning trigger for every cached project that needs it.
/// Per-project failures are collected; one broken project must not block
/// the rest.
pub async fn provision_check(
    State(context): State<Arc<AppContext>>,
) -> ApiResult<ProvisionCheckResponse> {
    let projects = context.projects.list_projects().await?;

    let mut response = ProvisionCheckResponse { checked: projects.len(), ..Default::default() };
    for project in projects.iter().filter(|project| project.needs_provisioning()) {
        match context.provisioning.provision(&project.id).await {
            Ok(Some(_)) => response.provisioned.push(project.id.clone()),
            Ok(None) => {}
            Err(err) => {
                warn!(project_id = project.id.as_str(), error = %err, "provisioning failed");
                response.failed.push(ProvisionFailure {
                    project_id: project.id.clone(),
                    message: err.to_string(),
                });
            }
        }
    }
    Ok(Json(response))
}
