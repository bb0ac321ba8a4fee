//! Webhook callback handler
//!
//! The remote service posts row events here; they dispatch through the
//! same row-processing path the polling fallback uses.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use plansync_core::PollSummary;
use plansync_domain::WebhookCallback;

use super::ApiResult;
use crate::context::AppContext;

pub async fn receive(
    State(context): State<Arc<AppContext>>,
    Json(callback): Json<WebhookCallback>,
) -> ApiResult<PollSummary> {
    let summary = context.polling.handle_webhook(callback).await?;
    Ok(Json(summary))
}
